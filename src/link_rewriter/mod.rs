//! Rewriting of remote references into relative local paths.
//!
//! Both the HTML and the CSS rewriter go through [`LinkRewriter::resolve_reference`]:
//! a reference is made absolute against the document's URL, looked up in the
//! session's [`AssetStore`], and on a hit replaced by the stored path relative
//! to the directory of the document being rewritten. References that were
//! never captured are left exactly as written.

pub mod css;
pub mod html;

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::assets::AssetStore;

/// Outcome of rewriting one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    /// Number of references replaced by local paths
    pub rewritten: usize,
}

/// Maps captured URLs to local paths inside HTML and CSS documents.
///
/// Cloning is cheap; all clones share the session's store.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    store: Arc<AssetStore>,
}

impl LinkRewriter {
    pub fn new(store: Arc<AssetStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Resolve `reference` as it appears in a document located at `base_url`
    /// and saved in `base_dir` (relative to the output root).
    ///
    /// Returns the local relative path when the target was captured, or the
    /// reference unchanged otherwise.
    pub fn resolve_reference<'a>(
        &self,
        reference: &'a str,
        base_url: &Url,
        base_dir: &Path,
    ) -> Cow<'a, str> {
        match self.local_reference(reference, base_url, base_dir) {
            Some(local) => Cow::Owned(local),
            None => Cow::Borrowed(reference),
        }
    }

    /// Local relative path for `reference`, or `None` when it must stay as is.
    pub fn local_reference(&self, reference: &str, base_url: &Url, base_dir: &Path) -> Option<String> {
        if is_exempt(reference) {
            return None;
        }

        let absolute = match base_url.join(reference) {
            Ok(url) => url,
            Err(e) => {
                tracing::trace!(target: "pageclone::rewrite", "Unresolvable reference {reference:?}: {e}");
                return None;
            }
        };

        let local_path = self.store.lookup(absolute.as_str())?;
        let relative = relative_path(&local_path, base_dir)?;

        tracing::trace!(
            target: "pageclone::rewrite",
            "{} -> {}",
            absolute,
            relative
        );

        Some(match absolute.fragment() {
            Some(fragment) => format!("{relative}#{fragment}"),
            None => relative,
        })
    }
}

/// References that are never rewritten: empty, fragment-only, inline data
/// and script pseudo-URLs.
fn is_exempt(reference: &str) -> bool {
    let trimmed = reference.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return true;
    }

    let lower = trimmed
        .get(..11)
        .unwrap_or(trimmed)
        .to_ascii_lowercase();
    lower.starts_with("data:") || lower.starts_with("javascript:")
}

/// `target` relative to `base_dir`, with forward slashes.
pub fn relative_path(target: &Path, base_dir: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(target, base_dir)?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}
