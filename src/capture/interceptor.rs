//! Per-response capture: classify, name, register, rewrite and persist.
//!
//! Response metadata arrives with `Network.responseReceived`, but the body is
//! only complete at `Network.loadingFinished`. The event loop keeps the
//! metadata keyed by request id and hands each finished response to its own
//! task, so responses are captured concurrently and in no particular order.
//! A failure while capturing one response is logged and never reaches the
//! session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams,
    Headers, RequestId,
};
use futures::{StreamExt, stream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::scripts;
use crate::assets::{AssetClass, AssetRecord, AssetStore, Registration, classify};
use crate::data_uri::DataUriExtractor;
use crate::link_rewriter::LinkRewriter;
use crate::utils::is_http_url;

/// Metadata of a response whose body has not finished loading yet
#[derive(Debug, Clone)]
struct PendingResponse {
    request_id: RequestId,
    url: String,
    content_type: String,
}

enum NetworkEvent {
    Received(Arc<EventResponseReceived>),
    Finished(Arc<EventLoadingFinished>),
    Failed(Arc<EventLoadingFailed>),
}

/// Counts capture tasks that are still running.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

struct InFlightGuard(Arc<InFlight>);

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Captures every completed response of the pages it is attached to.
#[derive(Debug)]
pub struct ResponseInterceptor {
    store: Arc<AssetStore>,
    rewriter: LinkRewriter,
    output_root: PathBuf,
    /// `<host>` of the page being cloned; every asset lands under it
    domain_dir_name: String,
    in_flight: Arc<InFlight>,
}

impl ResponseInterceptor {
    pub fn new(store: Arc<AssetStore>, output_root: impl Into<PathBuf>, domain_dir_name: impl Into<String>) -> Self {
        Self {
            rewriter: LinkRewriter::new(Arc::clone(&store)),
            store,
            output_root: output_root.into(),
            domain_dir_name: domain_dir_name.into(),
            in_flight: Arc::default(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<AssetStore> {
        &self.store
    }

    #[must_use]
    pub fn rewriter(&self) -> &LinkRewriter {
        &self.rewriter
    }

    /// Directory of the cloned page, relative to the output root.
    #[must_use]
    pub fn domain_dir(&self) -> &Path {
        Path::new(&self.domain_dir_name)
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Number of capture tasks still writing.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait up to `grace` for running capture tasks to finish.
    ///
    /// Returns `false` when tasks were still running at the end of the grace.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.in_flight.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(grace, wait).await.is_ok()
    }

    /// Subscribe to the response lifecycle of `page`.
    ///
    /// The returned task runs until the page goes away; each finished
    /// response is captured on its own spawned task.
    pub async fn attach(self: &Arc<Self>, page: &Page) -> Result<JoinHandle<()>> {
        let received = page
            .event_listener::<EventResponseReceived>()
            .await
            .context("Failed to subscribe to Network.responseReceived")?;
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("Failed to subscribe to Network.loadingFinished")?;
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("Failed to subscribe to Network.loadingFailed")?;

        let mut events = stream::select(
            received.map(NetworkEvent::Received),
            stream::select(
                finished.map(NetworkEvent::Finished),
                failed.map(NetworkEvent::Failed),
            ),
        );

        let interceptor = Arc::clone(self);
        let page = page.clone();

        Ok(tokio::spawn(async move {
            let mut pending: HashMap<String, PendingResponse> = HashMap::new();

            while let Some(event) = events.next().await {
                match event {
                    NetworkEvent::Received(event) => {
                        let response = &event.response;
                        if !is_http_url(&response.url) {
                            continue;
                        }
                        let content_type = header_value(&response.headers, "content-type")
                            .unwrap_or_else(|| response.mime_type.clone());
                        pending.insert(
                            event.request_id.inner().clone(),
                            PendingResponse {
                                request_id: event.request_id.clone(),
                                url: response.url.clone(),
                                content_type,
                            },
                        );
                    }
                    NetworkEvent::Finished(event) => {
                        if let Some(response) = pending.remove(event.request_id.inner()) {
                            // Counted before spawning so a drain never misses it.
                            let guard = interceptor.in_flight.enter();
                            let interceptor = Arc::clone(&interceptor);
                            let page = page.clone();
                            tokio::spawn(async move {
                                interceptor.capture(&page, response).await;
                                drop(guard);
                            });
                        }
                    }
                    NetworkEvent::Failed(event) => {
                        if let Some(response) = pending.remove(event.request_id.inner()) {
                            debug!(
                                target: "pageclone::capture",
                                "Loading failed for {}: {}",
                                response.url,
                                event.error_text
                            );
                        }
                    }
                }
            }
        }))
    }

    async fn capture(&self, page: &Page, response: PendingResponse) {
        let body = match read_body(page, response.request_id.clone(), &response.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(target: "pageclone::capture", "Could not read {}: {e:#}", response.url);
                return;
            }
        };

        match self.persist(&response.url, &response.content_type, body).await {
            Ok(Some(path)) => {
                info!(target: "pageclone::capture", "Saved {} -> {}", response.url, path.display());
            }
            Ok(None) => {}
            Err(e) => {
                warn!(target: "pageclone::capture", "Failed to save {}: {e:#}", response.url);
            }
        }
    }

    /// Classify, register and write one response body.
    ///
    /// Returns the stored path (relative to the output root) when this call
    /// wrote it, or `None` when the URL was already captured.
    pub async fn persist(&self, url: &str, content_type: &str, body: Vec<u8>) -> Result<Option<PathBuf>> {
        let class = classify(content_type, url);
        let record = AssetRecord::plan(url, content_type, class, &self.domain_dir_name)?;

        let relative = match self.store.register(record) {
            Registration::New(path) => path,
            Registration::Existing(path) => {
                trace!(
                    target: "pageclone::capture",
                    "Already captured {url} as {}",
                    path.display()
                );
                return Ok(None);
            }
        };

        let absolute = self.output_root.join(&relative);
        let parent = absolute
            .parent()
            .context("Asset path has no parent directory")?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        if class.is_text_document() {
            let text = String::from_utf8_lossy(&body);
            let base_dir = relative.parent().unwrap_or_else(|| Path::new(""));
            let rewritten = self
                .rewrite_document(&text, class, url, parent, base_dir)
                .await;
            tokio::fs::write(&absolute, rewritten)
                .await
                .with_context(|| format!("Failed to write {}", absolute.display()))?;
        } else {
            tokio::fs::write(&absolute, &body)
                .await
                .with_context(|| format!("Failed to write {}", absolute.display()))?;
        }

        Ok(Some(relative))
    }

    /// Extract embedded data into `<document dir>/embedded/`, then rewrite
    /// references relative to the document's own directory.
    ///
    /// A document that cannot be rewritten is returned with only its data
    /// URIs extracted.
    pub async fn rewrite_document(
        &self,
        text: &str,
        class: AssetClass,
        url: &str,
        document_dir: &Path,
        base_dir: &Path,
    ) -> String {
        let extraction = DataUriExtractor::new(document_dir.join("embedded"), class.embedded_prefix())
            .relative_to(document_dir)
            .extract(text)
            .await;

        let base_url = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                warn!(target: "pageclone::rewrite", "Not rewriting {url}: {e}");
                return extraction.text;
            }
        };

        match class {
            AssetClass::Css => {
                self.rewriter
                    .rewrite_css(&extraction.text, &base_url, base_dir)
                    .text
            }
            AssetClass::Html => match self.rewriter.rewrite_html(&extraction.text, &base_url, base_dir) {
                Ok(rewritten) => rewritten.text,
                Err(e) => {
                    warn!(target: "pageclone::rewrite", "HTML rewrite failed for {url}: {e:#}");
                    extraction.text
                }
            },
            _ => extraction.text,
        }
    }
}

/// Body of a finished response, falling back to a fetch from inside the page.
async fn read_body(page: &Page, request_id: RequestId, url: &str) -> Result<Vec<u8>> {
    match page.execute(GetResponseBodyParams::new(request_id)).await {
        Ok(body) => {
            if body.base64_encoded {
                STANDARD
                    .decode(&body.body)
                    .context("Response body is not valid base64")
            } else {
                Ok(body.body.clone().into_bytes())
            }
        }
        Err(e) => {
            debug!(
                target: "pageclone::capture",
                "Direct body read failed for {url} ({e}), re-fetching in page"
            );
            let encoded: Option<String> = scripts::evaluate(page, &scripts::fetch_as_base64_script(url)).await?;
            let encoded = encoded.context("In-page fetch failed")?;
            STANDARD
                .decode(encoded)
                .context("In-page fetch returned invalid base64")
        }
    }
}

/// Case-insensitive header lookup.
fn header_value(headers: &Headers, name: &str) -> Option<String> {
    headers
        .inner()
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let headers = Headers::new(serde_json::json!({
            "Content-Type": "text/css; charset=utf-8",
            "etag": "abc"
        }));
        assert_eq!(
            header_value(&headers, "content-type").as_deref(),
            Some("text/css; charset=utf-8")
        );
        assert_eq!(header_value(&headers, "x-missing"), None);
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_idle() {
        let interceptor = ResponseInterceptor::new(Arc::new(AssetStore::new()), "/tmp", "example.com");
        assert!(interceptor.drain(Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_running_tasks() {
        let interceptor = Arc::new(ResponseInterceptor::new(Arc::new(AssetStore::new()), "/tmp", "example.com"));

        let held = Arc::clone(&interceptor);
        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let _guard = held.in_flight.enter();
            let _ = entered_tx.send(());
            tokio::time::sleep(Duration::from_secs(1)).await;
        });
        entered_rx.await.unwrap();

        assert!(!interceptor.drain(Duration::from_millis(100)).await);
        assert!(interceptor.drain(Duration::from_secs(5)).await);
        assert_eq!(interceptor.in_flight(), 0);
    }
}
