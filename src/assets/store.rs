//! Session-scoped map from canonical remote URL to captured local file.
//!
//! The store is the single source of truth for "has this been captured".
//! It is owned by one capture session and handed to the interceptor, the
//! rewriters and the crawler by reference, never held as global state.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::classifier::AssetClass;
use super::path_resolver::hashed_file_name;
use crate::utils::canonicalize_url;

/// One captured resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Canonical absolute URL (fragment removed)
    pub source_url: String,
    pub content_type: String,
    pub asset_class: AssetClass,
    /// Path relative to the output root, e.g. `example.com/assets/css/<sha1>.css`
    pub local_path: PathBuf,
}

impl AssetRecord {
    /// Plan the record for a response captured under `domain_dir_name`.
    ///
    /// The local path is `<domain>/assets/<class>/<sha1(url)><ext>`, a pure
    /// function of its inputs.
    pub fn plan(
        url: &str,
        content_type: &str,
        asset_class: AssetClass,
        domain_dir_name: &str,
    ) -> anyhow::Result<Self> {
        let source_url = canonicalize_url(url)?;
        let local_path = Path::new(domain_dir_name)
            .join("assets")
            .join(asset_class.dir_name())
            .join(hashed_file_name(&source_url, content_type));

        Ok(Self {
            source_url,
            content_type: content_type.to_string(),
            asset_class,
            local_path,
        })
    }
}

/// Outcome of [`AssetStore::register`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// First registration of this URL; the caller owns the write.
    New(PathBuf),
    /// URL was already registered; the stored path is returned unchanged.
    Existing(PathBuf),
}

impl Registration {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Registration::New(p) | Registration::Existing(p) => p,
        }
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Registration::New(_))
    }
}

/// Concurrent URL -> local path table.
///
/// Check-then-register is a single atomic entry operation, so two response
/// events for the same URL can never install two different paths. Once set,
/// a record's `local_path` is never replaced.
#[derive(Debug, Default)]
pub struct AssetStore {
    records: DashMap<String, AssetRecord>,
}

impl AssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record unless its URL is already present.
    pub fn register(&self, record: AssetRecord) -> Registration {
        let key = canonical_key(&record.source_url);

        match self.records.entry(key) {
            Entry::Occupied(existing) => Registration::Existing(existing.get().local_path.clone()),
            Entry::Vacant(slot) => {
                let path = record.local_path.clone();
                slot.insert(record);
                Registration::New(path)
            }
        }
    }

    /// Local path (relative to the output root) for a URL, if captured.
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        self.records
            .get(&canonical_key(url))
            .map(|record| record.local_path.clone())
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.records.contains_key(&canonical_key(url))
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<AssetRecord> {
        self.records.get(&canonical_key(url)).map(|r| r.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of all records, sorted by URL.
    #[must_use]
    pub fn records(&self) -> Vec<AssetRecord> {
        let mut all: Vec<AssetRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.source_url.cmp(&b.source_url));
        all
    }

    /// Number of captured assets per class.
    #[must_use]
    pub fn counts_by_class(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts
                .entry(record.asset_class.dir_name().to_string())
                .or_insert(0) += 1;
        }
        counts
    }
}

/// Keys are canonical URLs; strings that do not parse are used verbatim.
fn canonical_key(url: &str) -> String {
    canonicalize_url(url).unwrap_or_else(|_| url.to_string())
}
