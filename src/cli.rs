//! Command-line interface definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::CaptureConfig;
use crate::error::CaptureResult;

/// Capture a rendered web page and every asset it loads for offline browsing.
///
/// The page lands in OUTPUT/<host>/index.html, its assets in
/// OUTPUT/<host>/assets/{html,css,js,images,fonts,...}.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Page to capture, e.g. https://example.com
    pub url: String,

    /// Folder that receives the mirror
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output: PathBuf,

    /// Wait for network idle again after scrolling and clicking
    #[arg(long)]
    pub full: bool,

    /// Total capture time: 500ms, 30s, 2m, or a bare number of seconds
    #[arg(long, value_parser = parse_timeout, default_value = "60s", allow_hyphen_values = true)]
    pub timeout: Duration,

    /// Show the browser window
    #[arg(long)]
    pub no_headless: bool,

    /// Also open every same-site link of the page once
    #[arg(long)]
    pub crawl_internal: bool,

    /// Replace linked stylesheets with inline <style> before the snapshot
    #[arg(long)]
    pub inline_css: bool,
}

impl Cli {
    /// Translate the parsed arguments into a validated config
    pub fn into_config(self) -> CaptureResult<CaptureConfig> {
        CaptureConfig::builder()
            .output_dir(self.output)
            .target_url(self.url)
            .timeout(self.timeout)
            .full_load(self.full)
            .headless(!self.no_headless)
            .crawl_internal(self.crawl_internal)
            .inline_stylesheets(self.inline_css)
            .build()
    }
}

/// Parse a duration written as `<n>ms`, `<n>s`, `<n>m` or a bare `<n>` in
/// seconds. Units are case-insensitive; `n` must be a positive integer.
pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return Err("timeout must not be empty".to_string());
    }

    let (digits, unit_ms): (&str, u64) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000)
    } else {
        (value.as_str(), 1_000)
    };

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!(
            "invalid timeout '{value}': expected a positive integer with optional ms, s or m suffix"
        ));
    }

    let amount: u64 = digits
        .parse()
        .map_err(|e| format!("invalid timeout '{value}': {e}"))?;
    if amount == 0 {
        return Err("timeout must be greater than zero".to_string());
    }

    amount
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("timeout '{value}' is too large"))
}
