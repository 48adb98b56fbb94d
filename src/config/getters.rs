//! Getter methods for `CaptureConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::CaptureConfig;

impl CaptureConfig {
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn full_load(&self) -> bool {
        self.full_load
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn crawl_internal(&self) -> bool {
        self.crawl_internal
    }

    #[must_use]
    pub fn inline_stylesheets(&self) -> bool {
        self.inline_stylesheets
    }

    #[must_use]
    pub fn max_scrolls(&self) -> usize {
        self.max_scrolls
    }

    #[must_use]
    pub fn post_interaction_wait(&self) -> Duration {
        self.post_interaction_wait
    }

    #[must_use]
    pub fn settle_poll(&self) -> Duration {
        self.settle_poll
    }

    #[must_use]
    pub fn network_idle(&self) -> Duration {
        self.network_idle
    }

    #[must_use]
    pub fn drain_grace(&self) -> Duration {
        self.drain_grace
    }

    #[must_use]
    pub fn load_more_phrases(&self) -> &[String] {
        &self.load_more_phrases
    }

    #[must_use]
    pub fn blocked_patterns(&self) -> &[String] {
        &self.blocked_patterns
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }
}
