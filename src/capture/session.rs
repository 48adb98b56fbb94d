//! The capture session: one browser, one page, one deadline.
//!
//! ```text
//! Launching -> Navigating -> Interacting -> Settling -> Snapshotting -> Finalizing -> Closed
//! ```
//!
//! Response capture runs in the background from the moment the page exists.
//! The session only drives the page forward and takes the final snapshot.
//! Finalizing always runs once the browser is up, whatever happened before it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, SetBypassCspParams,
};
use chromiumoxide::{Browser, Page};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::cleanup::{CleanupResult, cleanup_browser};
use super::deadline::Deadline;
use super::interceptor::ResponseInterceptor;
use super::lazy_load::LazyLoadCrawler;
use super::network_idle::NetworkIdleMonitor;
use super::request_filter::RequestFilter;
use super::scripts;
use super::tap::{CaptureTaps, PageTap};
use crate::assets::{AssetClass, AssetStore};
use crate::browser_setup::{LaunchOptions, launch_with_fallback, session_profile_dir};
use crate::config::CaptureConfig;
use crate::data_uri::DataUriExtractor;
use crate::error::{CaptureError, CaptureResult};
use crate::utils::{ACCEPT_LANGUAGE, host_dir_name};

/// Name of the entry document inside the domain directory
pub const INDEX_FILE_NAME: &str = "index.html";

/// Headroom added to the session budget for single CDP commands, so the
/// snapshot after an expired deadline can still complete.
const CDP_REQUEST_HEADROOM: Duration = Duration::from_secs(30);

/// Phase of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Launching,
    Navigating,
    Interacting,
    Settling,
    Snapshotting,
    Finalizing,
    Closed,
}

/// What a finished session produced
#[derive(Debug, Clone, Serialize)]
pub struct CaptureSummary {
    /// Absolute path of the written entry document
    pub index_path: PathBuf,
    /// URL the page ended up at after redirects
    pub final_url: String,
    /// Distinct URLs saved during the session
    pub assets_captured: usize,
    /// Captured assets per class directory name
    pub assets_by_class: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

pub struct CaptureSession {
    config: CaptureConfig,
    state: SessionState,
    store: Arc<AssetStore>,
    domain_dir_name: String,
}

impl CaptureSession {
    /// Prepare a session for `config`. Nothing is launched yet.
    pub fn new(config: CaptureConfig) -> CaptureResult<Self> {
        let target = Url::parse(config.target_url()).map_err(|e| CaptureError::InvalidUrl {
            url: config.target_url().to_string(),
            reason: e.to_string(),
        })?;
        let domain_dir_name = host_dir_name(&target).map_err(|e| CaptureError::InvalidUrl {
            url: config.target_url().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            config,
            state: SessionState::Launching,
            store: Arc::new(AssetStore::new()),
            domain_dir_name,
        })
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn store(&self) -> &Arc<AssetStore> {
        &self.store
    }

    /// `<output>/<host>`
    #[must_use]
    pub fn domain_dir(&self) -> PathBuf {
        self.config.output_dir().join(&self.domain_dir_name)
    }

    fn enter(&mut self, next: SessionState) {
        debug!(target: "pageclone::capture", "Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the whole session.
    ///
    /// Only a failed launch (after the fallback) or a failure to set up and
    /// write the entry document is an error; everything else degrades to a
    /// partial capture.
    pub async fn run(mut self) -> CaptureResult<CaptureSummary> {
        let started = Instant::now();
        let deadline = Deadline::after(self.config.timeout());

        info!(
            target: "pageclone::capture",
            "Capturing {} into {} (budget {:?})",
            self.config.target_url(),
            self.domain_dir().display(),
            self.config.timeout()
        );

        let options = LaunchOptions {
            headless: self.config.headless(),
            profile_dir: session_profile_dir(self.config.chrome_data_dir().map(PathBuf::as_path)),
            request_timeout: self.config.timeout() + CDP_REQUEST_HEADROOM,
        };
        let (launched, source) = launch_with_fallback(&options)
            .await
            .map_err(|e| CaptureError::BrowserLaunch(format!("{e:#}")))?;
        info!(
            target: "pageclone::browser",
            "Browser ready: {}",
            source.executable().display()
        );

        let outcome = self.drive(&launched.browser, deadline).await;

        self.enter(SessionState::Finalizing);
        match cleanup_browser(launched).await {
            CleanupResult::Success => {
                debug!(target: "pageclone::cleanup", "Browser cleanup completed successfully");
            }
            CleanupResult::PartialFailure(errors) => {
                warn!(target: "pageclone::cleanup", "Cleanup completed with failures: {errors:?}");
            }
        }
        self.enter(SessionState::Closed);

        let (index_path, final_url) = outcome?;
        let summary = CaptureSummary {
            index_path,
            final_url,
            assets_captured: self.store.len(),
            assets_by_class: self.store.counts_by_class(),
            elapsed: started.elapsed(),
        };
        info!(
            target: "pageclone::capture",
            "Capture finished in {:.1}s: {} assets {:?}",
            summary.elapsed.as_secs_f64(),
            summary.assets_captured,
            summary.assets_by_class
        );
        Ok(summary)
    }

    /// Everything between launch and cleanup. Returns the entry document path
    /// and the final page URL.
    async fn drive(&mut self, browser: &Browser, deadline: Deadline) -> CaptureResult<(PathBuf, String)> {
        let interceptor = Arc::new(ResponseInterceptor::new(
            Arc::clone(&self.store),
            self.config.output_dir(),
            self.domain_dir_name.clone(),
        ));
        let filter = Arc::new(RequestFilter::new(self.config.blocked_patterns().iter().cloned()));
        let taps = CaptureTaps::new(filter, Arc::clone(&interceptor));
        let monitor = Arc::new(NetworkIdleMonitor::new(self.config.network_idle()));

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open capture page")?;
        self.prepare_page(&page).await?;
        let _tap: PageTap = taps.attach_with_idle(&page, &monitor).await?;

        self.enter(SessionState::Navigating);
        self.navigate(&page, &monitor, &deadline).await;

        self.enter(SessionState::Interacting);
        self.interact(&page, browser, &taps, &monitor, &deadline).await;

        self.enter(SessionState::Settling);
        self.settle(&deadline).await;

        self.enter(SessionState::Snapshotting);
        if !interceptor.drain(self.config.drain_grace()).await {
            warn!(
                target: "pageclone::capture",
                "{} response handlers still running after {:?}",
                interceptor.in_flight(),
                self.config.drain_grace()
            );
        }

        let html = page.content().await.context("Failed to serialize the DOM")?;
        let final_url = match page.url().await {
            Ok(Some(url)) if url != "about:blank" => url,
            _ => self.config.target_url().to_string(),
        };
        let index_path = write_entry_document(&interceptor, &html, &final_url).await?;
        info!(target: "pageclone::capture", "Wrote {}", index_path.display());

        Ok((index_path, final_url))
    }

    /// Init scripts and headers, installed before the first navigation.
    async fn prepare_page(&self, page: &Page) -> Result<()> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            scripts::DISABLE_SERVICE_WORKER_SCRIPT,
        ))
        .await
        .context("Failed to install service worker guard")?;

        if self.config.inline_stylesheets() {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(scripts::BLOB_CAPTURE_SCRIPT))
                .await
                .context("Failed to install blob capture script")?;
            // fetch() of cross-origin stylesheets from the page needs this
            page.execute(SetBypassCspParams::new(true))
                .await
                .context("Failed to bypass CSP")?;
        }

        let headers = Headers::new(serde_json::json!({ "Accept-Language": ACCEPT_LANGUAGE }));
        page.execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .context("Failed to set extra HTTP headers")?;
        Ok(())
    }

    /// Load the target and wait for network idle, bounded only by the deadline.
    async fn navigate(&self, page: &Page, monitor: &NetworkIdleMonitor, deadline: &Deadline) {
        let target = self.config.target_url();

        match deadline.run(page.goto(target)).await {
            Some(Ok(_)) => debug!(target: "pageclone::capture", "Loaded {target}"),
            Some(Err(e)) => {
                warn!(target: "pageclone::capture", "Navigation to {target} reported an error: {e}");
            }
            None => {
                warn!(target: "pageclone::capture", "Deadline reached while loading {target}");
                return;
            }
        }

        if deadline.run(monitor.wait_for_idle()).await.is_none() {
            warn!(
                target: "pageclone::capture",
                "Network never went idle ({} requests in flight at deadline)",
                monitor.in_flight()
            );
        }
    }

    async fn interact(
        &self,
        page: &Page,
        browser: &Browser,
        taps: &CaptureTaps,
        monitor: &NetworkIdleMonitor,
        deadline: &Deadline,
    ) {
        let settings = self.config.interaction_settings();
        let crawler = LazyLoadCrawler::new(&settings, *deadline);

        let stats = crawler.scroll_and_interact(page).await;
        info!(
            target: "pageclone::crawl",
            "Interaction done: {} scrolls, {} load-more clicks",
            stats.scrolls,
            stats.clicks
        );

        deadline.sleep(self.config.post_interaction_wait()).await;

        if self.config.inline_stylesheets() {
            match deadline.run(scripts::evaluate::<usize>(page, scripts::INLINE_STYLESHEETS_SCRIPT)).await {
                Some(Ok(count)) => info!(target: "pageclone::capture", "Inlined {count} stylesheets"),
                Some(Err(e)) => warn!(target: "pageclone::capture", "Stylesheet inlining failed: {e:#}"),
                None => warn!(target: "pageclone::capture", "Deadline reached while inlining stylesheets"),
            }
        }

        if self.config.crawl_internal() {
            let stats = crawler.crawl_internal_links(page, browser, taps).await;
            info!(
                target: "pageclone::crawl",
                "Internal crawl: {} links, {} visited, {} failed",
                stats.discovered,
                stats.visited,
                stats.failed
            );
        }

        if self.config.full_load() && deadline.run(monitor.wait_for_idle()).await.is_none() {
            warn!(target: "pageclone::capture", "Deadline reached before the page went idle again");
        }
    }

    /// Spend the rest of the budget letting late responses arrive.
    async fn settle(&self, deadline: &Deadline) {
        let remaining = deadline.remaining();
        debug!(target: "pageclone::capture", "Settling for {remaining:?}");
        while deadline.sleep(self.config.settle_poll()).await {
            debug!(
                target: "pageclone::capture",
                "{} assets captured, {:?} left",
                self.store.len(),
                deadline.remaining()
            );
        }
    }
}

/// Rewrite the serialized DOM and write it as `<output>/<host>/index.html`.
///
/// Embedded data goes to `<host>/assets/html/embedded/`, and every reference
/// to a captured asset becomes relative to the domain directory.
pub async fn write_entry_document(interceptor: &ResponseInterceptor, html: &str, page_url: &str) -> Result<PathBuf> {
    let domain_dir = interceptor.output_root().join(interceptor.domain_dir());
    tokio::fs::create_dir_all(&domain_dir)
        .await
        .with_context(|| format!("Failed to create {}", domain_dir.display()))?;

    let embedded_dir = domain_dir
        .join("assets")
        .join(AssetClass::Html.dir_name())
        .join("embedded");
    let extraction = DataUriExtractor::new(embedded_dir, AssetClass::Html.embedded_prefix())
        .relative_to(&domain_dir)
        .extract(html)
        .await;

    let base_url = Url::parse(page_url).with_context(|| format!("Invalid page URL {page_url}"))?;
    let rewritten = match interceptor
        .rewriter()
        .rewrite_html(&extraction.text, &base_url, interceptor.domain_dir())
    {
        Ok(rewritten) => {
            debug!(
                target: "pageclone::rewrite",
                "Entry document: {} references rewritten, {} data URIs extracted",
                rewritten.rewritten,
                extraction.extracted
            );
            rewritten.text
        }
        Err(e) => {
            warn!(target: "pageclone::rewrite", "Entry document rewrite failed: {e:#}");
            extraction.text
        }
    };

    let index_path = domain_dir.join(INDEX_FILE_NAME);
    tokio::fs::write(&index_path, rewritten)
        .await
        .with_context(|| format!("Failed to write {}", index_path.display()))?;
    Ok(index_path)
}
