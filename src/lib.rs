pub mod assets;
pub mod browser_setup;
pub mod capture;
pub mod cli;
pub mod config;
pub mod data_uri;
pub mod error;
pub mod link_rewriter;
pub mod utils;

pub use assets::{AssetClass, AssetRecord, AssetStore, Registration, classify};
pub use browser_setup::{
    BrowserSource, LaunchOptions, LaunchedBrowser, download_managed_browser,
    find_browser_executable, launch_browser, launch_with_fallback,
};
pub use capture::{CaptureSession, CaptureSummary, RequestFilter, ResponseInterceptor, SessionState};
pub use config::CaptureConfig;
pub use data_uri::{DataUriExtractor, Extraction, extract_data_uris};
pub use error::{CaptureError, CaptureResult};
pub use link_rewriter::{LinkRewriter, Rewritten};

/// Capture `config.target_url()` into `config.output_dir()`.
///
/// Returns once the browser has been shut down. Only a browser that cannot be
/// launched at all, or an entry document that cannot be written, is an error.
pub async fn capture(config: CaptureConfig) -> CaptureResult<CaptureSummary> {
    CaptureSession::new(config)?.run().await
}
