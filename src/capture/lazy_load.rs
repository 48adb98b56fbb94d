//! Page interaction that provokes additional network activity.
//!
//! Two behaviours: a fixed-count scroll loop that also clicks "load more"
//! style controls, and an optional breadth-one visit of same-site links in
//! auxiliary tabs. Neither saves anything itself; the interceptor attached
//! to each page does.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use tracing::{debug, info, warn};
use url::Url;

use super::deadline::{Deadline, with_timeout};
use super::scripts;
use super::tap::CaptureTaps;
use crate::utils::{canonicalize_url, is_same_site};

/// Tunables for the scroll/interact loop and the internal crawl
#[derive(Debug, Clone)]
pub struct InteractionSettings {
    pub max_scrolls: usize,
    pub scroll_delay: Duration,
    pub click_pause: Duration,
    pub load_more_phrases: Vec<String>,
    pub aux_navigation_timeout: Duration,
    pub aux_settle: Duration,
}

/// What the scroll loop did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionStats {
    pub scrolls: usize,
    pub clicks: usize,
}

/// What the internal crawl did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub discovered: usize,
    pub visited: usize,
    pub failed: usize,
}

pub struct LazyLoadCrawler<'a> {
    settings: &'a InteractionSettings,
    deadline: Deadline,
}

impl<'a> LazyLoadCrawler<'a> {
    pub fn new(settings: &'a InteractionSettings, deadline: Deadline) -> Self {
        Self { settings, deadline }
    }

    /// Scroll one screen per iteration and click the first matching
    /// "load more" control, for exactly `max_scrolls` iterations.
    ///
    /// The loop does not stop when the page stops growing; only the session
    /// deadline cuts it short.
    pub async fn scroll_and_interact(&self, page: &Page) -> InteractionStats {
        let mut stats = InteractionStats::default();
        let candidates_script = scripts::load_more_candidates_script(&self.settings.load_more_phrases);

        for iteration in 0..self.settings.max_scrolls {
            if self.deadline.is_expired() {
                info!(
                    target: "pageclone::crawl",
                    "Deadline reached after {iteration} scroll iterations"
                );
                break;
            }

            if let Err(e) = scripts::evaluate::<bool>(page, scripts::SCROLL_ONE_SCREEN_SCRIPT).await {
                debug!(target: "pageclone::crawl", "Scroll {iteration} failed: {e:#}");
            } else {
                stats.scrolls += 1;
            }

            if !self.deadline.sleep(self.settings.scroll_delay).await {
                break;
            }

            if self.click_first_load_more(page, &candidates_script).await {
                stats.clicks += 1;
            }
        }

        debug!(
            target: "pageclone::crawl",
            "Scroll loop done: {} scrolls, {} clicks",
            stats.scrolls,
            stats.clicks
        );
        stats
    }

    /// Click the first candidate that accepts a click. Candidates that are
    /// detached or intercepted are skipped.
    async fn click_first_load_more(&self, page: &Page, candidates_script: &str) -> bool {
        let selectors: Vec<String> = match scripts::evaluate(page, candidates_script).await {
            Ok(selectors) => selectors,
            Err(e) => {
                debug!(target: "pageclone::crawl", "Load-more scan failed: {e:#}");
                return false;
            }
        };

        for selector in selectors {
            let element = match page.find_element(selector.as_str()).await {
                Ok(element) => element,
                Err(e) => {
                    debug!(target: "pageclone::crawl", "Load-more candidate vanished: {e}");
                    continue;
                }
            };

            match element.click().await {
                Ok(_) => {
                    info!(target: "pageclone::crawl", "Clicked load-more control {selector}");
                    self.deadline.sleep(self.settings.click_pause).await;
                    return true;
                }
                Err(e) => {
                    debug!(target: "pageclone::crawl", "Click on {selector} failed: {e}");
                }
            }
        }

        false
    }

    /// Open every same-site link of `page` that has not been captured yet in
    /// an auxiliary tab. Links found in those tabs are not followed.
    pub async fn crawl_internal_links(&self, page: &Page, browser: &Browser, taps: &CaptureTaps) -> CrawlStats {
        let mut stats = CrawlStats::default();

        let page_url = match page.url().await {
            Ok(Some(url)) => url,
            Ok(None) => return stats,
            Err(e) => {
                warn!(target: "pageclone::crawl", "Could not read page URL: {e}");
                return stats;
            }
        };

        let found: Vec<String> = match scripts::evaluate(page, scripts::COLLECT_LINKS_SCRIPT).await {
            Ok(found) => found,
            Err(e) => {
                warn!(target: "pageclone::crawl", "Link collection failed: {e:#}");
                return stats;
            }
        };

        let links = filter_internal_links(&found, &page_url);
        stats.discovered = links.len();
        info!(target: "pageclone::crawl", "Found {} internal links", links.len());

        for link in links {
            if self.deadline.is_expired() {
                info!(target: "pageclone::crawl", "Deadline reached, stopping internal crawl");
                break;
            }
            if taps.interceptor().store().contains(&link) {
                continue;
            }

            match self.visit(browser, taps, &link).await {
                Ok(()) => stats.visited += 1,
                Err(e) => {
                    warn!(target: "pageclone::crawl", "Auxiliary visit of {link} failed: {e:#}");
                    stats.failed += 1;
                }
            }
        }

        stats
    }

    /// Load `link` in a fresh tab sharing the browser context. The tab is
    /// closed on every path.
    async fn visit(&self, browser: &Browser, taps: &CaptureTaps, link: &str) -> Result<()> {
        info!(target: "pageclone::crawl", "Visiting {link}");
        let tab = browser
            .new_page("about:blank")
            .await
            .context("Failed to open auxiliary tab")?;

        let result = async {
            let _tap = taps.attach(&tab).await?;
            with_timeout(
                &self.deadline,
                async {
                    tab.goto(link).await.context("Navigation failed")?;
                    Ok(())
                },
                self.settings.aux_navigation_timeout,
                "Auxiliary navigation",
            )
            .await?;
            self.deadline.sleep(self.settings.aux_settle).await;
            Ok(())
        }
        .await;

        if let Err(e) = tab.close().await {
            debug!(target: "pageclone::crawl", "Closing auxiliary tab failed: {e}");
        }
        result
    }
}

/// Same-site http(s) links from `found`, fragments removed, deduplicated in
/// first-seen order, excluding `page_url` itself.
#[must_use]
pub fn filter_internal_links(found: &[String], page_url: &str) -> Vec<String> {
    let Ok(page) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Some(site_host) = page.host_str() else {
        return Vec::new();
    };
    let page_key = canonicalize_url(page_url).unwrap_or_default();

    let mut seen = HashSet::new();
    found
        .iter()
        .map(|raw| raw.trim())
        .filter(|raw| {
            let lower = raw.to_ascii_lowercase();
            !(raw.is_empty()
                || raw.starts_with('#')
                || lower.starts_with("javascript:")
                || lower.starts_with("data:"))
        })
        .filter_map(|raw| Url::parse(raw).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| url.host_str().is_some_and(|host| is_same_site(host, site_host)))
        .filter_map(|url| canonicalize_url(url.as_str()).ok())
        .filter(|link| *link != page_key)
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
