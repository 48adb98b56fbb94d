//! Shared helpers for the pageclone integration tests

use std::sync::Arc;

use pageclone::{AssetClass, AssetRecord, AssetStore, LinkRewriter, ResponseInterceptor};
use tempfile::TempDir;

pub const DOMAIN: &str = "example.com";

/// Store pre-populated with `(url, content type)` captures under [`DOMAIN`]
#[allow(dead_code)]
pub fn store_with(captures: &[(&str, &str)]) -> Arc<AssetStore> {
    let store = Arc::new(AssetStore::new());
    for (url, content_type) in captures {
        let class = pageclone::classify(content_type, url);
        let record = AssetRecord::plan(url, content_type, class, DOMAIN).expect("plannable URL");
        store.register(record);
    }
    store
}

#[allow(dead_code)]
pub fn rewriter_with(captures: &[(&str, &str)]) -> LinkRewriter {
    LinkRewriter::new(store_with(captures))
}

/// Interceptor writing below a fresh temp dir, with its own empty store
#[allow(dead_code)]
pub fn interceptor_in_tempdir() -> (TempDir, ResponseInterceptor) {
    let dir = TempDir::new().expect("temp dir");
    let interceptor = ResponseInterceptor::new(Arc::new(AssetStore::new()), dir.path(), DOMAIN);
    (dir, interceptor)
}

/// Number of regular files below `dir`, recursively
#[allow(dead_code)]
pub fn count_files(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}

/// Stored local path of `url`, relative to the output root
#[allow(dead_code)]
pub fn local_path(store: &AssetStore, url: &str) -> std::path::PathBuf {
    store.lookup(url).expect("URL was captured")
}

#[allow(dead_code)]
pub fn class_of(store: &AssetStore, url: &str) -> AssetClass {
    store.get(url).expect("URL was captured").asset_class
}
