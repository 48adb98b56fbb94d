//! Core configuration type for a page capture
//!
//! `CaptureConfig` carries every tunable of one capture session. It is only
//! constructed through [`CaptureConfig::builder`], which validates the target
//! and normalizes the output directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::lazy_load::InteractionSettings;

/// Main configuration struct for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Root of the mirror. The page lands in `<output_dir>/<host>/`.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    pub(crate) output_dir: PathBuf,

    /// Absolute http(s) URL of the page to capture
    pub(crate) target_url: String,

    /// Total budget of the session, from launch to snapshot
    pub(crate) timeout: Duration,

    /// Wait for network idle once more after interaction
    pub(crate) full_load: bool,
    pub(crate) headless: bool,

    /// Visit same-site links in auxiliary tabs (breadth one)
    pub(crate) crawl_internal: bool,

    /// Replace `<link rel="stylesheet">` with inline `<style>` before the snapshot
    pub(crate) inline_stylesheets: bool,

    pub(crate) max_scrolls: usize,
    pub(crate) scroll_delay: Duration,
    pub(crate) click_pause: Duration,
    pub(crate) post_interaction_wait: Duration,
    pub(crate) settle_poll: Duration,
    pub(crate) aux_navigation_timeout: Duration,
    pub(crate) aux_settle: Duration,

    /// Quiet period with no request in flight that counts as idle
    pub(crate) network_idle: Duration,

    /// Upper bound on waiting for response handlers before the snapshot
    pub(crate) drain_grace: Duration,

    pub(crate) load_more_phrases: Vec<String>,

    /// URL substrings whose requests are aborted before they are sent
    pub(crate) blocked_patterns: Vec<String>,

    /// Parent directory for the per-session browser profile.
    /// Defaults to the system temp dir.
    pub(crate) chrome_data_dir: Option<PathBuf>,
}

impl CaptureConfig {
    /// Set the parent directory of the browser profile
    ///
    /// Each session still gets its own unique profile below this directory,
    /// and that profile is removed when the session ends.
    ///
    /// # Example
    /// ```rust
    /// # use pageclone::config::CaptureConfig;
    /// # fn main() -> Result<(), pageclone::CaptureError> {
    /// let config = CaptureConfig::builder()
    ///     .output_dir("./mirror")
    ///     .target_url("https://example.com")
    ///     .build()?
    ///     .with_chrome_data_dir(std::env::temp_dir().join("pageclone-profiles"));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn with_chrome_data_dir(mut self, dir: PathBuf) -> Self {
        self.chrome_data_dir = Some(dir);
        self
    }

    /// Settings consumed by the scroll loop and the internal crawl
    #[must_use]
    pub fn interaction_settings(&self) -> InteractionSettings {
        InteractionSettings {
            max_scrolls: self.max_scrolls,
            scroll_delay: self.scroll_delay,
            click_pause: self.click_pause,
            load_more_phrases: self.load_more_phrases.clone(),
            aux_navigation_timeout: self.aux_navigation_timeout,
            aux_settle: self.aux_settle,
        }
    }
}
