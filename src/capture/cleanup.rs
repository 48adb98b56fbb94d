//! Browser shutdown at the end of a capture session.

use crate::browser_setup::LaunchedBrowser;
use tracing::{debug, warn};

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    /// All cleanup operations succeeded
    Success,
    /// Some cleanup operations failed, with error details
    PartialFailure(Vec<String>),
}

/// Close the browser, wait for its process, stop the handler task and remove
/// the session profile directory. Never fails; problems are collected.
pub async fn cleanup_browser(launched: LaunchedBrowser) -> CleanupResult {
    let LaunchedBrowser {
        mut browser,
        handler,
        profile_dir,
    } = launched;
    let mut errors = Vec::new();

    debug!(target: "pageclone::cleanup", "Closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "pageclone::cleanup", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    if let Err(e) = browser.wait().await {
        warn!(target: "pageclone::cleanup", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    }

    handler.abort();

    if let Err(e) = tokio::fs::remove_dir_all(&profile_dir).await {
        warn!(
            target: "pageclone::cleanup",
            "Failed to remove browser profile {}: {e}",
            profile_dir.display()
        );
        errors.push(format!("Profile cleanup failed: {e}"));
    } else {
        debug!(target: "pageclone::cleanup", "Removed browser profile {}", profile_dir.display());
    }

    if errors.is_empty() {
        CleanupResult::Success
    } else {
        CleanupResult::PartialFailure(errors)
    }
}
