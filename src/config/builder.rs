//! Type-safe builder for `CaptureConfig` using the typestate pattern
//!
//! The output directory and the target URL are required, in that order;
//! `build()` only exists once both are set.

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use super::types::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::utils::{
    DEFAULT_AUX_NAVIGATION_TIMEOUT, DEFAULT_AUX_SETTLE, DEFAULT_BLOCKED_PATTERNS,
    DEFAULT_CAPTURE_TIMEOUT, DEFAULT_CLICK_PAUSE, DEFAULT_DRAIN_GRACE, DEFAULT_LOAD_MORE_PHRASES,
    DEFAULT_MAX_SCROLLS, DEFAULT_NETWORK_IDLE, DEFAULT_POST_INTERACTION_WAIT,
    DEFAULT_SCROLL_DELAY, DEFAULT_SETTLE_POLL,
};

// Type states for the builder
pub struct WithOutputDir;
pub struct WithTargetUrl;

pub struct CaptureConfigBuilder<State = ()> {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) target_url: Option<String>,
    pub(crate) timeout: Duration,
    pub(crate) full_load: bool,
    pub(crate) headless: bool,
    pub(crate) crawl_internal: bool,
    pub(crate) inline_stylesheets: bool,
    pub(crate) max_scrolls: usize,
    pub(crate) scroll_delay: Duration,
    pub(crate) click_pause: Duration,
    pub(crate) post_interaction_wait: Duration,
    pub(crate) settle_poll: Duration,
    pub(crate) aux_navigation_timeout: Duration,
    pub(crate) aux_settle: Duration,
    pub(crate) network_idle: Duration,
    pub(crate) drain_grace: Duration,
    pub(crate) load_more_phrases: Vec<String>,
    pub(crate) blocked_patterns: Vec<String>,
    pub(crate) chrome_data_dir: Option<PathBuf>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CaptureConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_dir: None,
            target_url: None,
            timeout: DEFAULT_CAPTURE_TIMEOUT,
            full_load: false,
            headless: true,
            crawl_internal: false,
            inline_stylesheets: false,
            max_scrolls: DEFAULT_MAX_SCROLLS,
            scroll_delay: DEFAULT_SCROLL_DELAY,
            click_pause: DEFAULT_CLICK_PAUSE,
            post_interaction_wait: DEFAULT_POST_INTERACTION_WAIT,
            settle_poll: DEFAULT_SETTLE_POLL,
            aux_navigation_timeout: DEFAULT_AUX_NAVIGATION_TIMEOUT,
            aux_settle: DEFAULT_AUX_SETTLE,
            network_idle: DEFAULT_NETWORK_IDLE,
            drain_grace: DEFAULT_DRAIN_GRACE,
            load_more_phrases: DEFAULT_LOAD_MORE_PHRASES.iter().map(|p| (*p).to_string()).collect(),
            blocked_patterns: DEFAULT_BLOCKED_PATTERNS.iter().map(|p| (*p).to_string()).collect(),
            chrome_data_dir: None,
            _phantom: PhantomData,
        }
    }
}

impl CaptureConfig {
    /// Create a builder for configuring a `CaptureConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CaptureConfigBuilder<()> {
        CaptureConfigBuilder::default()
    }
}

impl<State> CaptureConfigBuilder<State> {
    /// Move every field into a builder of another state
    fn transition<Next>(self) -> CaptureConfigBuilder<Next> {
        CaptureConfigBuilder {
            output_dir: self.output_dir,
            target_url: self.target_url,
            timeout: self.timeout,
            full_load: self.full_load,
            headless: self.headless,
            crawl_internal: self.crawl_internal,
            inline_stylesheets: self.inline_stylesheets,
            max_scrolls: self.max_scrolls,
            scroll_delay: self.scroll_delay,
            click_pause: self.click_pause,
            post_interaction_wait: self.post_interaction_wait,
            settle_poll: self.settle_poll,
            aux_navigation_timeout: self.aux_navigation_timeout,
            aux_settle: self.aux_settle,
            network_idle: self.network_idle,
            drain_grace: self.drain_grace,
            load_more_phrases: self.load_more_phrases,
            blocked_patterns: self.blocked_patterns,
            chrome_data_dir: self.chrome_data_dir,
            _phantom: PhantomData,
        }
    }
}

impl CaptureConfigBuilder<()> {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> CaptureConfigBuilder<WithOutputDir> {
        self.output_dir = Some(dir.into());
        self.transition()
    }
}

impl CaptureConfigBuilder<WithOutputDir> {
    pub fn target_url(mut self, url: impl Into<String>) -> CaptureConfigBuilder<WithTargetUrl> {
        let url_string = url.into().trim().to_string();

        // Normalize URL: add https:// if no scheme is present
        let normalized_url = if url_string.contains("://") {
            url_string
        } else {
            format!("https://{url_string}")
        };

        self.target_url = Some(normalized_url);
        self.transition()
    }
}

// Build method only available when all required fields are set
impl CaptureConfigBuilder<WithTargetUrl> {
    pub fn build(self) -> CaptureResult<CaptureConfig> {
        let target_url = self
            .target_url
            .ok_or_else(|| CaptureError::Config("target_url is required".into()))?;
        validate_target(&target_url)?;

        let output_dir = self
            .output_dir
            .ok_or_else(|| CaptureError::Config("output_dir is required".into()))?;
        if output_dir.as_os_str().is_empty() {
            return Err(CaptureError::Config("output_dir must not be empty".into()));
        }
        let output_dir = std::path::absolute(&output_dir).map_err(|e| {
            CaptureError::Config(format!(
                "Cannot resolve output_dir '{}': {e}",
                output_dir.display()
            ))
        })?;

        if self.timeout.is_zero() {
            return Err(CaptureError::Config("timeout must be greater than zero".into()));
        }

        Ok(CaptureConfig {
            output_dir,
            target_url,
            timeout: self.timeout,
            full_load: self.full_load,
            headless: self.headless,
            crawl_internal: self.crawl_internal,
            inline_stylesheets: self.inline_stylesheets,
            max_scrolls: self.max_scrolls,
            scroll_delay: self.scroll_delay,
            click_pause: self.click_pause,
            post_interaction_wait: self.post_interaction_wait,
            settle_poll: self.settle_poll,
            aux_navigation_timeout: self.aux_navigation_timeout,
            aux_settle: self.aux_settle,
            network_idle: self.network_idle,
            drain_grace: self.drain_grace,
            load_more_phrases: self.load_more_phrases,
            blocked_patterns: self.blocked_patterns,
            chrome_data_dir: self.chrome_data_dir,
        })
    }
}

/// Accept only absolute http(s) URLs that name a host.
fn validate_target(target: &str) -> CaptureResult<()> {
    let invalid = |reason: &str| CaptureError::InvalidUrl {
        url: target.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(invalid("URL has no host")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = CaptureConfig::builder()
            .output_dir("/tmp/mirror")
            .target_url("https://example.com/page")
            .build()
            .expect("valid config");

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_scrolls, 50);
        assert!(config.headless);
        assert!(!config.full_load);
        assert!(!config.crawl_internal);
        assert_eq!(config.load_more_phrases, vec!["load more", "show more", "view more"]);
        assert!(config.blocked_patterns.iter().any(|p| p == "adservice."));
    }

    #[test]
    fn missing_scheme_defaults_to_https() {
        let config = CaptureConfig::builder()
            .output_dir("/tmp/mirror")
            .target_url("example.com")
            .build()
            .expect("valid config");
        assert_eq!(config.target_url, "https://example.com");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = CaptureConfig::builder()
            .output_dir("/tmp/mirror")
            .target_url("ftp://example.com/file")
            .build()
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_urls_without_host() {
        let err = CaptureConfig::builder()
            .output_dir("/tmp/mirror")
            .target_url("https://")
            .build()
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidUrl { .. }));
    }

    #[test]
    fn relative_output_dir_becomes_absolute() {
        let config = CaptureConfig::builder()
            .output_dir("mirror")
            .target_url("https://example.com")
            .build()
            .expect("valid config");
        assert!(config.output_dir.is_absolute());
        assert!(config.output_dir.ends_with("mirror"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = CaptureConfig::builder()
            .output_dir("/tmp/mirror")
            .target_url("https://example.com")
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, CaptureError::Config(_)));
    }
}
