//! Pre-fetch gate for manifests and known analytics/ad/tracking requests.
//!
//! Requests are paused through the CDP `Fetch` domain before they leave the
//! browser. A paused request whose URL contains a denylisted substring is
//! failed with `BlockedByClient`; every other request continues unmodified.

use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::utils::constants::DEFAULT_BLOCKED_PATTERNS;

/// Stateless substring denylist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    patterns: Vec<String>,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_PATTERNS.iter().map(|p| (*p).to_string()))
    }
}

impl RequestFilter {
    pub fn new(patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            patterns: patterns.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// First denylist entry contained in `url`, if any.
    #[must_use]
    pub fn matching_pattern(&self, url: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|pattern| url.contains(pattern.as_str()))
            .map(String::as_str)
    }

    /// Whether the request for `url` must never reach the network.
    #[must_use]
    pub fn should_abort(&self, url: &str) -> bool {
        self.matching_pattern(url).is_some()
    }

    /// Enable request interception on `page` and answer every paused request.
    ///
    /// The returned task runs until the page goes away.
    pub async fn attach(self: &Arc<Self>, page: &Page) -> Result<JoinHandle<()>> {
        let mut paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .context("Failed to subscribe to Fetch.requestPaused")?;

        page.execute(EnableParams {
            patterns: Some(vec![RequestPattern {
                url_pattern: Some("*".to_string()),
                resource_type: None,
                request_stage: Some(RequestStage::Request),
            }]),
            handle_auth_requests: None,
        })
        .await
        .context("Failed to enable request interception")?;

        let filter = Arc::clone(self);
        let page = page.clone();

        Ok(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let url = &event.request.url;

                let outcome = if let Some(pattern) = filter.matching_pattern(url) {
                    info!(target: "pageclone::filter", "Blocked {url} (matched {pattern:?})");
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    trace!(target: "pageclone::filter", "Continue {url}");
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };

                // Requests of a frame that navigated away can no longer be answered.
                if let Err(e) = outcome {
                    debug!(target: "pageclone::filter", "Could not answer paused request {url}: {e}");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_denylist() {
        let filter = RequestFilter::default();
        assert!(filter.should_abort("https://adservice.google.com/x"));
        assert!(filter.should_abort("https://www.google-analytics.com/analytics.js"));
        assert!(filter.should_abort("https://example.com/manifest.json"));
        assert!(filter.should_abort("https://stats.g.doubleclick.net/r/collect"));
        assert!(!filter.should_abort("https://example.com/style.css"));
    }

    #[test]
    fn substring_false_positives_are_accepted() {
        let filter = RequestFilter::default();
        assert!(filter.should_abort("https://example.com/blog/tracking.html"));
    }

    #[test]
    fn custom_patterns_ignore_empty_entries() {
        let filter = RequestFilter::new(vec![String::new(), "ads.".to_string()]);
        assert_eq!(filter.patterns().len(), 1);
        assert_eq!(filter.matching_pattern("https://ads.example.com/a.js"), Some("ads."));
        assert!(!filter.should_abort("https://example.com/"));
    }
}
