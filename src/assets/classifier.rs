//! Content-type based asset classification.
//!
//! Every captured resource lands in `assets/<class>/`, where the class is
//! chosen from its content type with a URL-extension fallback for fonts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse asset category used to choose a storage subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Html,
    Css,
    Js,
    Images,
    Fonts,
    Videos,
    Audio,
    Json,
    Misc,
}

impl AssetClass {
    pub const ALL: [AssetClass; 9] = [
        AssetClass::Html,
        AssetClass::Css,
        AssetClass::Js,
        AssetClass::Images,
        AssetClass::Fonts,
        AssetClass::Videos,
        AssetClass::Audio,
        AssetClass::Json,
        AssetClass::Misc,
    ];

    /// Directory name under `assets/`
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            AssetClass::Html => "html",
            AssetClass::Css => "css",
            AssetClass::Js => "js",
            AssetClass::Images => "images",
            AssetClass::Fonts => "fonts",
            AssetClass::Videos => "videos",
            AssetClass::Audio => "audio",
            AssetClass::Json => "json",
            AssetClass::Misc => "misc",
        }
    }

    /// Whether captured bodies of this class are rewritten before saving.
    #[must_use]
    pub const fn is_text_document(self) -> bool {
        matches!(self, AssetClass::Html | AssetClass::Css)
    }

    /// Prefix for data-URI files extracted from documents of this class.
    #[must_use]
    pub fn embedded_prefix(self) -> String {
        format!("{}_embedded", self.dir_name())
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Classify a response by content type, falling back to the URL for fonts.
///
/// Rules are checked in order and the first match wins. A missing or
/// unparseable content type never fails; it classifies as `Misc`.
#[must_use]
pub fn classify(content_type: &str, url: &str) -> AssetClass {
    let ct = content_type.trim().to_ascii_lowercase();

    if ct.starts_with("text/html") {
        AssetClass::Html
    } else if ct.starts_with("text/css") {
        AssetClass::Css
    } else if ct.starts_with("text/javascript") || ct.starts_with("application/javascript") {
        AssetClass::Js
    } else if ct.starts_with("image/") {
        AssetClass::Images
    } else if ct.starts_with("font/")
        || ct.starts_with("application/font")
        || url.contains(".woff")
        || url.contains(".ttf")
    {
        AssetClass::Fonts
    } else if ct.starts_with("video/") {
        AssetClass::Videos
    } else if ct.starts_with("audio/") {
        AssetClass::Audio
    } else if ct.starts_with("application/json") {
        AssetClass::Json
    } else {
        AssetClass::Misc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_mime_prefix() {
        assert_eq!(classify("text/html; charset=utf-8", ""), AssetClass::Html);
        assert_eq!(classify("text/css", ""), AssetClass::Css);
        assert_eq!(classify("application/javascript", ""), AssetClass::Js);
        assert_eq!(classify("text/javascript;charset=UTF-8", ""), AssetClass::Js);
        assert_eq!(classify("image/svg+xml", ""), AssetClass::Images);
        assert_eq!(classify("font/woff2", ""), AssetClass::Fonts);
        assert_eq!(classify("application/font-woff", ""), AssetClass::Fonts);
        assert_eq!(classify("video/mp4", ""), AssetClass::Videos);
        assert_eq!(classify("audio/mpeg", ""), AssetClass::Audio);
        assert_eq!(classify("application/json", ""), AssetClass::Json);
    }

    #[test]
    fn font_extension_fallback() {
        assert_eq!(
            classify("application/octet-stream", "https://cdn.example.com/f/inter.woff2"),
            AssetClass::Fonts
        );
        assert_eq!(classify("", "https://example.com/a.ttf?v=1"), AssetClass::Fonts);
    }

    #[test]
    fn earlier_rules_win() {
        // An image whose URL mentions .woff is still an image.
        assert_eq!(
            classify("image/png", "https://example.com/preview.woff.png"),
            AssetClass::Images
        );
    }

    #[test]
    fn missing_or_garbage_type_is_misc() {
        assert_eq!(classify("", "https://example.com/x"), AssetClass::Misc);
        assert_eq!(classify(";;;", "https://example.com/x"), AssetClass::Misc);
        assert_eq!(classify("application/wasm", ""), AssetClass::Misc);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(classify("Text/CSS", ""), AssetClass::Css);
    }
}
