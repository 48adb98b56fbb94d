//! Live capture of a page through the browser.
//!
//! The session owns the browser and drives the page. Everything observed on
//! the wire goes through the request filter, then the response interceptor,
//! which saves and rewrites into the shared asset store.

pub mod cleanup;
pub mod deadline;
pub mod interceptor;
pub mod lazy_load;
pub mod network_idle;
pub mod request_filter;
pub mod scripts;
pub mod session;
pub mod tap;

pub use cleanup::{CleanupResult, cleanup_browser};
pub use deadline::{Deadline, with_timeout};
pub use interceptor::ResponseInterceptor;
pub use lazy_load::{CrawlStats, InteractionSettings, InteractionStats, LazyLoadCrawler, filter_internal_links};
pub use network_idle::NetworkIdleMonitor;
pub use request_filter::RequestFilter;
pub use session::{CaptureSession, CaptureSummary, INDEX_FILE_NAME, SessionState, write_entry_document};
pub use tap::{CaptureTaps, PageTap};
