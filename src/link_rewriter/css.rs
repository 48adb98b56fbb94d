//! `url(...)` rewriting for stylesheets.
//!
//! A small tokenizer walks the stylesheet so that comments and string
//! literals are never mistaken for references. Every `url(...)` token whose
//! target was captured is replaced by `url(<relative path>)`; everything else,
//! including malformed tails, is copied through unchanged.

use std::path::Path;

use url::Url;

use super::{LinkRewriter, Rewritten};

impl LinkRewriter {
    /// Rewrite every `url(...)` and `@import "<string>"` reference in `css`.
    pub fn rewrite_css(&self, css: &str, base_url: &Url, base_dir: &Path) -> Rewritten {
        let bytes = css.as_bytes();
        let mut out = String::with_capacity(css.len());
        let mut copied = 0;
        let mut rewritten = 0;
        let mut after_import = false;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];

            if bytes[i..].starts_with(b"/*") {
                i = find(bytes, i + 2, b"*/").map_or(bytes.len(), |end| end + 2);
                continue;
            }

            if b == b'"' || b == b'\'' {
                let end = skip_string(bytes, i);
                // `@import "x.css"` carries a bare string instead of url().
                if after_import && end > i + 1 && bytes[end - 1] == b {
                    let value = &css[i + 1..end - 1];
                    if let Some(local) = self.local_reference(value, base_url, base_dir) {
                        out.push_str(&css[copied..i]);
                        out.push_str(&quote(&local));
                        copied = end;
                        rewritten += 1;
                    }
                }
                after_import = false;
                i = end;
                continue;
            }

            if b == b'@' && starts_with_ignore_case(&bytes[i + 1..], b"import") {
                after_import = true;
                i += 7;
                continue;
            }

            if (b == b'u' || b == b'U')
                && starts_with_ignore_case(&bytes[i..], b"url(")
                && (i == 0 || !is_ident_byte(bytes[i - 1]))
            {
                after_import = false;
                let Some(token) = parse_url_token(css, i) else {
                    i += 4;
                    continue;
                };

                if let Some(local) = self.local_reference(token.value, base_url, base_dir) {
                    out.push_str(&css[copied..i]);
                    out.push_str("url(");
                    out.push_str(&quote_if_needed(&local));
                    out.push(')');
                    copied = token.end;
                    rewritten += 1;
                }
                i = token.end;
                continue;
            }

            if !b.is_ascii_whitespace() {
                after_import = false;
            }
            i += 1;
        }

        if rewritten == 0 {
            return Rewritten {
                text: css.to_string(),
                rewritten,
            };
        }

        out.push_str(&css[copied..]);
        Rewritten {
            text: out,
            rewritten,
        }
    }
}

struct UrlToken<'a> {
    /// Reference inside the parentheses, quotes and padding removed
    value: &'a str,
    /// Byte offset just past the closing parenthesis
    end: usize,
}

/// Parse `url(...)` starting at `start`; `None` when the token never closes
/// or is not a valid url token.
fn parse_url_token(css: &str, start: usize) -> Option<UrlToken<'_>> {
    let bytes = css.as_bytes();
    let mut i = skip_whitespace(bytes, start + 4);

    match bytes.get(i)? {
        &q @ (b'"' | b'\'') => {
            let end = skip_string(bytes, i);
            if bytes.get(end - 1) != Some(&q) || end == i + 1 {
                return None;
            }
            let value = &css[i + 1..end - 1];
            i = skip_whitespace(bytes, end);
            (bytes.get(i) == Some(&b')')).then(|| UrlToken { value, end: i + 1 })
        }
        _ => {
            let value_start = i;
            while i < bytes.len() {
                match bytes[i] {
                    b')' => break,
                    b'"' | b'\'' | b'(' => return None,
                    b'\\' => i += 2,
                    b if b.is_ascii_whitespace() => {
                        let value_end = i;
                        i = skip_whitespace(bytes, i);
                        return (bytes.get(i) == Some(&b')')).then(|| UrlToken {
                            value: &css[value_start..value_end],
                            end: i + 1,
                        });
                    }
                    _ => i += 1,
                }
            }
            // An escape as the last byte steps past the end.
            (i < bytes.len()).then(|| UrlToken {
                value: &css[value_start..i],
                end: i + 1,
            })
        }
    }
}

/// Offset just past the string literal opening at `start`. Unterminated
/// strings end at the newline or end of input.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn starts_with_ignore_case(bytes: &[u8], prefix: &[u8]) -> bool {
    bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn quote(path: &str) -> String {
    format!("\"{}\"", path.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_if_needed(path: &str) -> String {
    let needs_quotes = path
        .bytes()
        .any(|b| b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b'"' | b'\'' | b'\\'));
    if needs_quotes { quote(path) } else { path.to_string() }
}
