//! Shared configuration constants for pageclone
//!
//! Default values used by the config builder and the capture pipeline, kept
//! in one place to avoid magic numbers scattered across modules.

use std::time::Duration;

/// Default total capture budget: 60 seconds
///
/// The whole session (navigation, interaction, settling, snapshot) is bounded
/// by this deadline. The CLI overrides it with `--timeout`.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of scroll/interact iterations run by the lazy-load crawler.
pub const DEFAULT_MAX_SCROLLS: usize = 50;

/// Pause after each scroll so triggered requests can complete.
pub const DEFAULT_SCROLL_DELAY: Duration = Duration::from_millis(500);

/// Pause after a successful "load more" click.
pub const DEFAULT_CLICK_PAUSE: Duration = Duration::from_millis(500);

/// Extra wait after interaction for late style/script injections.
pub const DEFAULT_POST_INTERACTION_WAIT: Duration = Duration::from_millis(3500);

/// Poll increment used while settling out the remaining budget.
pub const DEFAULT_SETTLE_POLL: Duration = Duration::from_secs(1);

/// Navigation bound for auxiliary tabs opened by the internal link crawl.
pub const DEFAULT_AUX_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// How long an auxiliary tab stays open after navigating.
pub const DEFAULT_AUX_SETTLE: Duration = Duration::from_secs(1);

/// Quiet period with zero in-flight requests that counts as network idle.
pub const DEFAULT_NETWORK_IDLE: Duration = Duration::from_millis(500);

/// Upper bound on waiting for in-flight response handlers before the snapshot.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Visible-text phrases that identify "load more" style controls.
pub const DEFAULT_LOAD_MORE_PHRASES: &[&str] = &["load more", "show more", "view more"];

/// URL substrings that identify manifests and analytics/ad/tracking requests.
///
/// Matching is a plain substring test, so a legitimate resource whose URL
/// happens to contain one of these is blocked too.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[
    "manifest.json",
    "google-analytics.com",
    "analytics.",
    "tracker.",
    "tracking.",
    "adservice.",
    "pagead",
    "doubleclick.net",
];

/// Viewport used for the captured page.
pub const VIEWPORT_WIDTH: u32 = 1366;
pub const VIEWPORT_HEIGHT: u32 = 900;

/// Accept-Language sent with every request; some CDNs vary CSS on it.
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Chrome user agent string presented by the capture browser
///
/// Update quarterly to stay within a reasonable version window.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
