//! Error type returned by the public capture entry point
//!
//! Everything below the entry point works in `anyhow::Result`; only failures
//! that end the whole session surface here.

/// Session-fatal capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Target is not an absolute http(s) URL with a host
    #[error("Invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Configuration could not be built or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Neither the system browser nor the managed fallback could be launched
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Output could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, with the full context chain
    #[error("Capture error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for CaptureError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps every context layer on one line
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for results of the public API
pub type CaptureResult<T> = Result<T, CaptureError>;
