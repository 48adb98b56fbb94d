//! Deterministic local file names for captured resources.
//!
//! The name is the SHA-1 of the URL string in hex, followed by an extension
//! chosen from the content type. Same URL and type always give the same name,
//! so repeated captures overwrite identical files instead of forking paths.

use sha1::{Digest, Sha1};

/// Extension used when the content type is unknown or unparseable.
pub const FALLBACK_EXTENSION: &str = ".bin";

/// Content-type to extension table (essence only, lowercase).
const EXTENSIONS: &[(&str, &str)] = &[
    // Web / Text
    ("text/html", ".html"),
    ("application/xhtml+xml", ".xhtml"),
    ("text/css", ".css"),
    ("text/javascript", ".js"),
    ("application/javascript", ".js"),
    ("application/x-javascript", ".js"),
    ("application/json", ".json"),
    ("application/manifest+json", ".webmanifest"),
    ("text/plain", ".txt"),
    ("text/xml", ".xml"),
    ("application/xml", ".xml"),
    ("text/csv", ".csv"),
    // Images
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/avif", ".avif"),
    ("image/svg+xml", ".svg"),
    ("image/x-icon", ".ico"),
    ("image/vnd.microsoft.icon", ".ico"),
    ("image/bmp", ".bmp"),
    ("image/tiff", ".tiff"),
    // Fonts
    ("font/woff", ".woff"),
    ("font/woff2", ".woff2"),
    ("font/ttf", ".ttf"),
    ("font/otf", ".otf"),
    ("application/font-woff", ".woff"),
    ("application/font-woff2", ".woff2"),
    ("application/x-font-ttf", ".ttf"),
    ("application/vnd.ms-fontobject", ".eot"),
    // Audio
    ("audio/mpeg", ".mp3"),
    ("audio/ogg", ".ogg"),
    ("audio/wav", ".wav"),
    ("audio/webm", ".weba"),
    ("audio/aac", ".aac"),
    ("audio/flac", ".flac"),
    // Video
    ("video/mp4", ".mp4"),
    ("video/webm", ".webm"),
    ("video/ogg", ".ogv"),
    ("video/quicktime", ".mov"),
    // Documents / Binary
    ("application/pdf", ".pdf"),
    ("application/wasm", ".wasm"),
    ("application/zip", ".zip"),
];

/// Extension (with leading dot) for a content type, or `.bin` when unknown.
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map_or(FALLBACK_EXTENSION, |(_, ext)| ext)
}

/// Hex SHA-1 digest of a URL string.
#[must_use]
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha1::digest(url.as_bytes()))
}

/// File name for a resource: `<sha1(url)><ext>`.
#[must_use]
pub fn hashed_file_name(url: &str, content_type: &str) -> String {
    format!("{}{}", url_digest(url), extension_for(content_type))
}
