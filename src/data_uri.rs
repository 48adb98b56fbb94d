//! Extraction of inline base64 `data:` payloads into standalone files.
//!
//! Each `data:<mime>;base64,<payload>` literal in a document is decoded and
//! written to `<output_dir>/<prefix>_<n>.<ext>`, where `n` is the 1-based
//! occurrence index in document order. The literal is replaced by a reference
//! to the written file. Occurrences that fail to decode or write are left in
//! place and the rest of the document is still processed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::assets::extension_for;

static DATA_URI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data:([a-zA-Z0-9/+\-.]+);base64,([a-zA-Z0-9+/=]+)")
        .expect("Invalid data URI regex")
});

/// Result of running the extractor over one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// Files written
    pub extracted: usize,
    /// Occurrences left in place after a decode or write failure
    pub failed: usize,
}

/// Extracts data URIs of a single document into one output folder.
#[derive(Debug, Clone)]
pub struct DataUriExtractor {
    output_dir: PathBuf,
    prefix: String,
    reference_dir: Option<PathBuf>,
}

impl DataUriExtractor {
    /// Replacements are bare file names unless [`Self::relative_to`] is set.
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            reference_dir: None,
        }
    }

    /// Emit references relative to `dir` (the directory of the document being
    /// rewritten) instead of bare file names.
    #[must_use]
    pub fn relative_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reference_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Rewrite `text`, writing every decodable payload to disk.
    ///
    /// The output directory is only created when at least one payload
    /// decodes, so text without data URIs leaves the filesystem untouched.
    pub async fn extract(&self, text: &str) -> Extraction {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut extracted = 0;
        let mut failed = 0;
        let mut dir_ready = false;

        for (index, caps) in DATA_URI_REGEX.captures_iter(text).enumerate() {
            let (Some(whole), Some(mime), Some(payload)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            out.push_str(&text[last..whole.start()]);
            last = whole.end();

            let file_name = format!(
                "{}_{}{}",
                self.prefix,
                index + 1,
                extension_for(mime.as_str())
            );

            match self
                .write_payload(&file_name, payload.as_str(), &mut dir_ready)
                .await
            {
                Ok(path) => {
                    debug!(target: "pageclone::rewrite", "Extracted embedded data URI -> {}", path.display());
                    out.push_str(&self.reference_for(&file_name));
                    extracted += 1;
                }
                Err(e) => {
                    warn!(target: "pageclone::rewrite", "Skipping embedded data URI #{}: {e:#}", index + 1);
                    out.push_str(whole.as_str());
                    failed += 1;
                }
            }
        }

        if last == 0 && extracted == 0 && failed == 0 {
            return Extraction {
                text: text.to_string(),
                extracted,
                failed,
            };
        }

        out.push_str(&text[last..]);
        Extraction {
            text: out,
            extracted,
            failed,
        }
    }

    async fn write_payload(
        &self,
        file_name: &str,
        payload: &str,
        dir_ready: &mut bool,
    ) -> anyhow::Result<PathBuf> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| anyhow::anyhow!("Malformed base64 payload: {e}"))?;

        if !*dir_ready {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            *dir_ready = true;
        }

        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    fn reference_for(&self, file_name: &str) -> String {
        let Some(reference_dir) = &self.reference_dir else {
            return file_name.to_string();
        };

        pathdiff::diff_paths(self.output_dir.join(file_name), reference_dir)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|| file_name.to_string())
    }
}

/// Convenience wrapper: extract with bare file-name references.
pub async fn extract_data_uris(text: &str, output_dir: &Path, prefix: &str) -> String {
    DataUriExtractor::new(output_dir, prefix)
        .extract(text)
        .await
        .text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn extracts_in_document_order() {
        let dir = TempDir::new().unwrap();
        let text = r#"<img src="data:image/png;base64,AAAA"><img src="data:image/gif;base64,R0lG">"#;

        let result = DataUriExtractor::new(dir.path(), "html_embedded")
            .extract(text)
            .await;

        assert_eq!(result.extracted, 2);
        assert_eq!(
            result.text,
            r#"<img src="html_embedded_1.png"><img src="html_embedded_2.gif">"#
        );
        assert_eq!(std::fs::read(dir.path().join("html_embedded_1.png")).unwrap(), vec![0, 0, 0]);
    }

    #[tokio::test]
    async fn malformed_payload_is_left_in_place() {
        let dir = TempDir::new().unwrap();
        let text = "a data:image/png;base64,AAAAA b data:image/png;base64,AAAA c";

        let result = DataUriExtractor::new(dir.path(), "css_embedded")
            .extract(text)
            .await;

        assert_eq!(result.failed, 1);
        assert_eq!(result.extracted, 1);
        // Index counts every occurrence, including the failed one.
        assert_eq!(result.text, "a data:image/png;base64,AAAAA b css_embedded_2.png c");
        assert!(!dir.path().join("css_embedded_1.png").exists());
    }

    #[tokio::test]
    async fn relative_reference() {
        let root = TempDir::new().unwrap();
        let embedded = root.path().join("assets").join("html").join("embedded");

        let result = DataUriExtractor::new(&embedded, "html_embedded")
            .relative_to(root.path())
            .extract("url(data:image/png;base64,AAAA)")
            .await;

        assert_eq!(result.text, "url(assets/html/embedded/html_embedded_1.png)");
        assert!(embedded.join("html_embedded_1.png").exists());
    }

    #[tokio::test]
    async fn no_data_uris_creates_nothing() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("embedded");

        let text = "<p>nothing to see</p>";
        assert_eq!(extract_data_uris(text, &out, "html_embedded").await, text);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn unknown_mime_uses_bin() {
        let dir = TempDir::new().unwrap();
        let result = DataUriExtractor::new(dir.path(), "x")
            .extract("data:application/x-thing;base64,AAAA")
            .await;
        assert_eq!(result.text, "x_1.bin");
    }
}
