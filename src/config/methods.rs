//! Builder methods available for all states
//!
//! Optional settings can be given before or after the required fields.

use std::path::PathBuf;
use std::time::Duration;

use super::builder::CaptureConfigBuilder;

impl<State> CaptureConfigBuilder<State> {
    /// Set the total session budget
    ///
    /// Navigation, interaction, settling and the snapshot all share this one
    /// deadline. Whatever is left after interaction is spent settling.
    ///
    /// # Example
    /// ```rust
    /// # use pageclone::config::CaptureConfig;
    /// # use std::time::Duration;
    /// # fn main() -> Result<(), pageclone::CaptureError> {
    /// let config = CaptureConfig::builder()
    ///     .output_dir("./mirror")
    ///     .target_url("https://example.com")
    ///     .timeout(Duration::from_secs(30))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for network idle a second time after the scroll loop
    #[must_use]
    pub fn full_load(mut self, full_load: bool) -> Self {
        self.full_load = full_load;
        self
    }

    /// Run the browser without a window (default)
    ///
    /// A visible window is mostly useful to watch what the scroll loop and
    /// the load-more clicks do on a particular site.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn crawl_internal(mut self, crawl: bool) -> Self {
        self.crawl_internal = crawl;
        self
    }

    #[must_use]
    pub fn inline_stylesheets(mut self, inline: bool) -> Self {
        self.inline_stylesheets = inline;
        self
    }

    #[must_use]
    pub fn max_scrolls(mut self, scrolls: usize) -> Self {
        self.max_scrolls = scrolls;
        self
    }

    #[must_use]
    pub fn scroll_delay(mut self, delay: Duration) -> Self {
        self.scroll_delay = delay;
        self
    }

    #[must_use]
    pub fn click_pause(mut self, pause: Duration) -> Self {
        self.click_pause = pause;
        self
    }

    #[must_use]
    pub fn post_interaction_wait(mut self, wait: Duration) -> Self {
        self.post_interaction_wait = wait;
        self
    }

    #[must_use]
    pub fn settle_poll(mut self, poll: Duration) -> Self {
        self.settle_poll = poll;
        self
    }

    #[must_use]
    pub fn aux_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.aux_navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn aux_settle(mut self, settle: Duration) -> Self {
        self.aux_settle = settle;
        self
    }

    #[must_use]
    pub fn network_idle(mut self, quiet: Duration) -> Self {
        self.network_idle = quiet;
        self
    }

    #[must_use]
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Replace the visible-text phrases that identify "load more" controls
    #[must_use]
    pub fn load_more_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_more_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the request denylist
    ///
    /// Each entry is matched as a plain substring of the request URL. An
    /// empty list disables request blocking.
    #[must_use]
    pub fn blocked_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chrome_data_dir = Some(dir.into());
        self
    }
}
