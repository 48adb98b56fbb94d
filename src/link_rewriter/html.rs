//! HTML rewriting over a streaming parse with `lol_html`.
//!
//! URL-bearing attributes, `srcset` candidate lists, `<style>` contents and
//! `style` attributes are rewritten in place. Attributes are only touched when
//! their value actually changes, so markup without captured references comes
//! out byte-for-byte identical.
//!
//! `get_attribute` hands back the value as written in the markup, so entity
//! references (`&amp;` in query strings) are decoded before the store lookup,
//! and anything written back is re-encoded.

use std::cell::Cell;
use std::ops::Range;
use std::path::Path;

use anyhow::Result;
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter, Settings, element, text};
use url::Url;

use super::{LinkRewriter, Rewritten};

/// Single-URL attributes rewritten by selector.
const URL_ATTRIBUTES: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("img[src]", "src"),
    ("link[href]", "href"),
    ("script[src]", "src"),
    ("iframe[src]", "src"),
    ("source[src]", "src"),
    ("video[poster]", "poster"),
];

/// Attributes holding a `srcset` candidate list.
const SRCSET_ATTRIBUTES: &[(&str, &str)] = &[("img[srcset]", "srcset"), ("source[srcset]", "srcset")];

impl LinkRewriter {
    /// Rewrite every captured reference in `html`, a document fetched from
    /// `base_url` and saved in `base_dir` (relative to the output root).
    pub fn rewrite_html(&self, html: &str, base_url: &Url, base_dir: &Path) -> Result<Rewritten> {
        let count = Cell::new(0usize);
        let mut output = Vec::with_capacity(html.len());

        {
            let count = &count;
            let mut style_text = String::new();

            let mut handlers: Vec<_> = URL_ATTRIBUTES
                .iter()
                .map(|&(selector, attr)| {
                    element!(selector, move |el| {
                        if let Some(value) = el.get_attribute(attr)
                            && let Some(local) = self.local_reference(&decode_html_entities(&value), base_url, base_dir)
                        {
                            el.set_attribute(attr, &encode_double_quoted_attribute(&local))?;
                            count.set(count.get() + 1);
                        }
                        Ok(())
                    })
                })
                .collect();

            handlers.extend(SRCSET_ATTRIBUTES.iter().map(|&(selector, attr)| {
                element!(selector, move |el| {
                    if let Some(value) = el.get_attribute(attr) {
                        let (rewritten, n) = self.rewrite_srcset(&value, base_url, base_dir);
                        if n > 0 {
                            el.set_attribute(attr, &rewritten)?;
                            count.set(count.get() + n);
                        }
                    }
                    Ok(())
                })
            }));

            handlers.push(element!("[style]", move |el| {
                if let Some(value) = el.get_attribute("style") {
                    let css = self.rewrite_css(&decode_html_entities(&value), base_url, base_dir);
                    if css.rewritten > 0 {
                        el.set_attribute("style", &encode_double_quoted_attribute(&css.text))?;
                        count.set(count.get() + css.rewritten);
                    }
                }
                Ok(())
            }));

            // Style text may arrive in several chunks; hold them back and
            // emit the rewritten stylesheet with the last one.
            handlers.push(text!("style", move |chunk| {
                style_text.push_str(chunk.as_str());
                if chunk.last_in_text_node() {
                    let css = self.rewrite_css(&style_text, base_url, base_dir);
                    count.set(count.get() + css.rewritten);
                    chunk.replace(&css.text, ContentType::Html);
                    style_text.clear();
                } else {
                    chunk.remove();
                }
                Ok(())
            }));

            let mut rewriter = HtmlRewriter::new(
                Settings {
                    element_content_handlers: handlers,
                    ..Settings::default()
                },
                |c: &[u8]| output.extend_from_slice(c),
            );

            rewriter
                .write(html.as_bytes())
                .map_err(|e| anyhow::anyhow!("HtmlRewriter error: {e}"))?;
            rewriter
                .end()
                .map_err(|e| anyhow::anyhow!("HtmlRewriter end error: {e}"))?;
        }

        let text = String::from_utf8(output)
            .map_err(|e| anyhow::anyhow!("Invalid UTF-8 in rewritten HTML: {e}"))?;

        Ok(Rewritten {
            text,
            rewritten: count.get(),
        })
    }

    /// Rewrite each candidate URL of a `srcset` value independently.
    ///
    /// `srcset` is the attribute text as written in the markup: candidates
    /// are entity-decoded for the lookup, while descriptors, separators and
    /// untouched candidates are kept exactly as written.
    pub fn rewrite_srcset(&self, srcset: &str, base_url: &Url, base_dir: &Path) -> (String, usize) {
        let mut out = String::with_capacity(srcset.len());
        let mut copied = 0;
        let mut rewritten = 0;

        for range in srcset_candidates(srcset) {
            let candidate = decode_html_entities(&srcset[range.clone()]);
            if let Some(local) = self.local_reference(&candidate, base_url, base_dir) {
                out.push_str(&srcset[copied..range.start]);
                out.push_str(&encode_double_quoted_attribute(&local));
                copied = range.end;
                rewritten += 1;
            }
        }

        out.push_str(&srcset[copied..]);
        (out, rewritten)
    }
}

/// Byte ranges of the URL of every candidate in a `srcset` value.
///
/// Follows the HTML candidate grammar: a URL runs up to the next whitespace
/// (so commas inside `data:` URLs stay part of it), trailing commas end the
/// candidate, and descriptors run up to the next top-level comma.
pub fn srcset_candidates(srcset: &str) -> Vec<Range<usize>> {
    let bytes = srcset.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut end = i;
        while end > start && bytes[end - 1] == b',' {
            end -= 1;
        }
        if end > start {
            ranges.push(start..end);
        }
        if end < i {
            continue;
        }

        let mut depth = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => {
                    i += 1;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
    }

    ranges
}
