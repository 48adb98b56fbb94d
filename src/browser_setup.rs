use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::utils::constants::{ACCEPT_LANGUAGE, CHROME_USER_AGENT, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// A running browser plus the task driving its CDP connection.
pub struct LaunchedBrowser {
    pub browser: Browser,
    pub handler: JoinHandle<()>,
    /// Profile directory owned by this browser, removed during cleanup
    pub profile_dir: PathBuf,
}

/// How a browser was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserSource {
    /// Chrome or Chromium installed on this machine
    System(PathBuf),
    /// Chromium downloaded into the user cache
    Managed(PathBuf),
}

impl BrowserSource {
    #[must_use]
    pub fn executable(&self) -> &Path {
        match self {
            BrowserSource::System(p) | BrowserSource::Managed(p) => p,
        }
    }
}

/// Launch parameters that do not depend on which executable is used.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub profile_dir: PathBuf,
    /// CDP command timeout; must cover the longest single wait of a session.
    pub request_timeout: Duration,
}

/// Environment variable that pins the browser executable
pub const BROWSER_ENV_VAR: &str = "CHROMIUM_PATH";

/// Executable names probed on `PATH` when no known install location exists
const PATH_PROBES: &[&str] = &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser", "chrome"];

#[cfg(target_os = "linux")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
    "/usr/local/bin/chromium",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[r"Google\Chrome\Application\chrome.exe", r"Chromium\Application\chrome.exe"];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const INSTALL_LOCATIONS: &[&str] = &[];

/// Locate an installed Chrome or Chromium.
///
/// Order: the `CHROMIUM_PATH` override, well-known install locations, then
/// a `PATH` lookup.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Some(pinned) = std::env::var_os(BROWSER_ENV_VAR).map(PathBuf::from) {
        if pinned.is_file() {
            info!(target: "pageclone::browser", path = %pinned.display(), "browser pinned by {BROWSER_ENV_VAR}");
            return Ok(pinned);
        }
        warn!(
            target: "pageclone::browser",
            path = %pinned.display(),
            "{BROWSER_ENV_VAR} does not name an existing file, searching instead"
        );
    }

    let found = install_roots()
        .iter()
        .flat_map(|root| INSTALL_LOCATIONS.iter().map(move |rel| root.join(rel)))
        .find(|candidate| candidate.is_file())
        .or_else(search_path);

    match found {
        Some(path) => {
            info!(target: "pageclone::browser", path = %path.display(), "system browser found");
            Ok(path)
        }
        None => anyhow::bail!("no Chrome or Chromium installation found"),
    }
}

/// Directories the relative install locations are resolved against.
fn install_roots() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
            .into_iter()
            .filter_map(std::env::var_os)
            .map(PathBuf::from)
            .collect()
    } else if cfg!(target_os = "macos") {
        std::iter::once(PathBuf::from("/"))
            .chain(dirs::home_dir())
            .collect()
    } else {
        vec![PathBuf::from("/")]
    }
}

/// Resolve the first probe name found in a `PATH` directory.
fn search_path() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let suffix = if cfg!(target_os = "windows") { ".exe" } else { "" };
    std::env::split_paths(&path_var).find_map(|dir| {
        PATH_PROBES
            .iter()
            .map(|name| dir.join(format!("{name}{suffix}")))
            .find(|candidate| candidate.is_file())
    })
}

/// Fetch a pinned Chromium build into the user cache and return its
/// executable. Later sessions reuse the cached copy.
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
    let install_dir = cache_root.join("pageclone").join("chromium");
    info!(target: "pageclone::browser", dir = %install_dir.display(), "fetching managed Chromium");

    tokio::fs::create_dir_all(&install_dir)
        .await
        .with_context(|| format!("cannot create {}", install_dir.display()))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(&install_dir)
        .build()
        .context("invalid Chromium fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Chromium download failed")?;

    debug!(
        target: "pageclone::browser",
        folder = %revision.folder_path.display(),
        "managed Chromium ready"
    );
    Ok(revision.executable_path)
}

/// Launch a browser, falling back once from the system install to a managed
/// download. The second failure is returned to the caller.
pub async fn launch_with_fallback(options: &LaunchOptions) -> Result<(LaunchedBrowser, BrowserSource)> {
    let first_error = match find_browser_executable() {
        Ok(path) => {
            let source = BrowserSource::System(path);
            match launch_browser(&source, options).await {
                Ok(launched) => return Ok((launched, source)),
                Err(e) => e,
            }
        }
        Err(e) => e,
    };

    warn!(
        target: "pageclone::browser",
        "System browser unavailable ({first_error:#}), falling back to managed Chromium"
    );

    let source = BrowserSource::Managed(
        download_managed_browser()
            .await
            .with_context(|| format!("Fallback after: {first_error:#}"))?,
    );
    let launched = launch_browser(&source, options)
        .await
        .with_context(|| format!("Fallback after: {first_error:#}"))?;
    Ok((launched, source))
}

/// Launch one browser from `source` with the capture profile.
pub async fn launch_browser(source: &BrowserSource, options: &LaunchOptions) -> Result<LaunchedBrowser> {
    tokio::fs::create_dir_all(&options.profile_dir)
        .await
        .context("Failed to create browser profile directory")?;

    let mut builder = BrowserConfigBuilder::default()
        .chrome_executable(source.executable())
        .user_data_dir(options.profile_dir.clone())
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .request_timeout(options.request_timeout);
    builder = if options.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    let config = builder
        .args(launch_args())
        .build()
        .map_err(|e| anyhow::anyhow!("invalid browser config: {e}"))?;

    info!(target: "pageclone::browser", executable = %source.executable().display(), "launching browser");
    let (browser, mut events) = Browser::launch(config)
        .await
        .with_context(|| format!("cannot launch {}", source.executable().display()))?;

    let handler = task::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(()) => {}
                Err(e) if is_undecodable_event(&e.to_string()) => {
                    trace!(target: "pageclone::browser", "skipped undecodable CDP message: {e}");
                }
                Err(e) => error!(target: "pageclone::browser", "CDP connection error: {e:?}"),
            }
        }
        debug!(target: "pageclone::browser", "CDP handler finished");
    });

    Ok(LaunchedBrowser {
        browser,
        handler,
        profile_dir: options.profile_dir.clone(),
    })
}

/// Chrome switches shared by every capture browser.
///
/// The page runs cross-origin and with mixed certificates so every asset it
/// references can be fetched; automation hints are hidden from scripts.
fn launch_args() -> Vec<String> {
    const SWITCHES: &[&str] = &[
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-web-security",
        "--disable-features=IsolateOrigins,site-per-process",
        "--disable-blink-features=AutomationControlled",
        "--ignore-certificate-errors",
        "--no-first-run",
        "--no-default-browser-check",
        "--disable-notifications",
        "--disable-popup-blocking",
        "--disable-background-timer-throttling",
        "--disable-backgrounding-occluded-windows",
        "--mute-audio",
    ];

    let language = ACCEPT_LANGUAGE.split(',').next().unwrap_or("en-US");
    [
        format!("--user-agent={CHROME_USER_AGENT}"),
        format!("--lang={language}"),
        format!("--accept-lang={ACCEPT_LANGUAGE}"),
    ]
    .into_iter()
    .chain(SWITCHES.iter().map(|s| (*s).to_string()))
    .collect()
}

/// chromiumoxide lags behind Chrome's protocol; events it cannot decode are
/// reported as errors but leave the connection usable.
fn is_undecodable_event(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

/// Unique profile directory for one capture session.
#[must_use]
pub fn session_profile_dir(base: Option<&Path>) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!("pageclone_chrome_{}_{n}", std::process::id());
    base.map_or_else(|| std::env::temp_dir().join(&name), |b| b.join(&name))
}
