//! URL helpers shared by the asset store, rewriters and crawler.

use anyhow::{Result, anyhow};
use url::Url;

/// Canonical form of an absolute URL used as the asset store key.
///
/// Parsing normalizes scheme and host case, default ports and dot segments.
/// The fragment is dropped because it never reaches the server; the query is
/// kept verbatim since it selects a different resource.
pub fn canonicalize_url(url: &str) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|e| anyhow!("Failed to parse URL {url}: {e}"))?;
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// Directory name for a capture domain: the host, plus `:port` when the URL
/// carries a non-default port.
pub fn host_dir_name(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("Invalid URL: no host in {url}"))?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Check that a URL is absolute and uses http or https
#[must_use]
pub fn is_http_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// True when `host` is `site_host` itself or one of its subdomains.
#[must_use]
pub fn is_same_site(host: &str, site_host: &str) -> bool {
    if site_host.is_empty() {
        return false;
    }
    host == site_host
        || host
            .strip_suffix(site_host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_url_drops_fragment_keeps_query() {
        assert_eq!(
            canonicalize_url("HTTPS://Example.COM:443/a/../b.css?v=2#x").unwrap(),
            "https://example.com/b.css?v=2"
        );
    }

    #[test]
    fn host_dir_includes_explicit_port() {
        let url = Url::parse("http://localhost:8080/page").unwrap();
        assert_eq!(host_dir_name(&url).unwrap(), "localhost:8080");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(host_dir_name(&url).unwrap(), "example.com");
    }

    #[test]
    fn same_site_accepts_subdomains_only() {
        assert!(is_same_site("example.com", "example.com"));
        assert!(is_same_site("cdn.example.com", "example.com"));
        assert!(!is_same_site("badexample.com", "example.com"));
        assert!(!is_same_site("example.org", "example.com"));
    }

    #[test]
    fn http_url_check() {
        assert!(is_http_url("https://example.com/x"));
        assert!(!is_http_url("data:text/plain,hi"));
        assert!(!is_http_url("/relative"));
    }
}
