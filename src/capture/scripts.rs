//! JavaScript evaluated inside the captured page.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use serde::de::DeserializeOwned;

/// Evaluate `script` as an expression, awaiting a returned promise, and
/// deserialize its value.
pub async fn evaluate<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T> {
    let params = EvaluateParams::builder()
        .expression(script)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid evaluate params: {e}"))?;

    page.evaluate_expression(params)
        .await
        .context("Script evaluation failed")?
        .into_value::<T>()
        .context("Unexpected script result")
}

/// Scroll the viewport down by one screen height.
pub const SCROLL_ONE_SCREEN_SCRIPT: &str = "window.scrollBy(0, window.innerHeight); true";

/// Injected before any document script runs.
///
/// Service workers can answer requests without a network exchange the
/// interceptor would see, so registration is neutralised.
pub const DISABLE_SERVICE_WORKER_SCRIPT: &str = r#"
(() => {
  if (navigator.serviceWorker && navigator.serviceWorker.register) {
    try {
      navigator.serviceWorker.register = new Proxy(navigator.serviceWorker.register, {
        apply() { return Promise.resolve({}); }
      });
    } catch (_) {}
  }
})();
"#;

/// Injected before any document script runs when stylesheets are inlined.
///
/// Records the text of every blob created through `URL.createObjectURL`, so
/// `blob:` stylesheets can be inlined after the fact.
pub const BLOB_CAPTURE_SCRIPT: &str = r#"
(() => {
  const originalCreate = URL.createObjectURL;
  const store = {};
  Object.defineProperty(window, '__pagecloneBlobText', { value: store });
  URL.createObjectURL = function (blob) {
    const url = originalCreate.call(URL, blob);
    try {
      if (blob instanceof Blob) {
        const reader = new FileReader();
        reader.onload = () => { store[url] = reader.result; };
        reader.readAsText(blob);
      }
    } catch (_) {}
    return url;
  };
})();
"#;

/// Replace every `<link rel="stylesheet">` with an equivalent `<style>`.
///
/// `blob:` stylesheets come from the blob capture store, others are fetched
/// from the page context with one level of `@import` expanded. Resolves to the
/// number of links replaced.
pub const INLINE_STYLESHEETS_SCRIPT: &str = r#"
(async () => {
  const fetchText = async (url) => {
    try {
      const res = await fetch(url, { credentials: 'include' });
      return res.ok ? await res.text() : null;
    } catch (_) {
      return null;
    }
  };
  const absolute = (href, base) => {
    try { return new URL(href, base).href; } catch (_) { return null; }
  };
  const expandImports = async (cssText, baseUrl) => {
    const importRe = /@import\s+(?:url\()?\s*['"]?([^'")\s]+)['"]?\s*\)?\s*([^;]*);/gi;
    const seen = new Set();
    const jobs = [];
    let result = cssText;
    let m;
    while ((m = importRe.exec(cssText)) !== null) {
      const statement = m[0];
      const target = absolute(m[1], baseUrl);
      if (!target || seen.has(target)) continue;
      seen.add(target);
      jobs.push((async () => {
        const text = await fetchText(target);
        if (text) {
          result = result.replace(statement,
            '\n/* inlined @import ' + target + ' */\n' + text + '\n/* end import */\n');
        }
      })());
    }
    await Promise.allSettled(jobs);
    return result;
  };

  let replaced = 0;
  const links = Array.from(document.querySelectorAll('link[rel="stylesheet"]'));
  for (const link of links) {
    const href = link.getAttribute('href') || '';
    let source = null;
    let css = null;
    if (href.startsWith('blob:')) {
      source = href;
      css = (window.__pagecloneBlobText && window.__pagecloneBlobText[href]) || null;
    } else {
      source = absolute(href, location.href);
      if (source) {
        css = await fetchText(source);
        if (css) css = await expandImports(css, source);
      }
    }
    if (!css) continue;
    const style = document.createElement('style');
    style.setAttribute('data-inlined-from', source);
    if (link.media) style.setAttribute('media', link.media);
    style.textContent = css;
    link.replaceWith(style);
    replaced += 1;
  }
  return replaced;
})()
"#;

/// Absolute URLs of every `href`/`src` bearing element in the document.
pub const COLLECT_LINKS_SCRIPT: &str = r#"
(() => {
  const urls = [];
  document.querySelectorAll('a[href]').forEach(a => urls.push(a.href));
  document
    .querySelectorAll('img[src], script[src], link[href], iframe[src], source[src]')
    .forEach(el => urls.push(el.hasAttribute('src') ? el.src : el.href));
  return urls.filter(u => typeof u === 'string' && u.length > 0);
})()
"#;

/// Script returning unique selectors for visible `button`/`a` elements whose
/// text contains one of `phrases` (case-insensitive), in document order.
#[must_use]
pub fn load_more_candidates_script(phrases: &[String]) -> String {
    let lowered: Vec<String> = phrases.iter().map(|p| p.to_lowercase()).collect();
    let phrases_json = serde_json::to_string(&lowered).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"
(() => {{
  const phrases = {phrases_json};
  const selectorFor = (el) => {{
    const parts = [];
    for (let node = el; node && node.nodeType === 1 && node !== document.documentElement; node = node.parentElement) {{
      let index = 1;
      for (let sib = node.previousElementSibling; sib; sib = sib.previousElementSibling) {{
        if (sib.tagName === node.tagName) index += 1;
      }}
      parts.unshift(node.tagName.toLowerCase() + ':nth-of-type(' + index + ')');
    }}
    return 'html > ' + parts.join(' > ');
  }};
  const out = [];
  for (const el of document.querySelectorAll('button, a')) {{
    const text = (el.innerText || '').toLowerCase();
    if (!phrases.some(p => text.includes(p))) continue;
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 && rect.height === 0) continue;
    out.push(selectorFor(el));
  }}
  return out;
}})()
"#
    )
}

/// Script re-fetching `url` from inside the page, resolving to its body as
/// base64 or `null` on failure.
#[must_use]
pub fn fetch_as_base64_script(url: &str) -> String {
    let url_json = serde_json::to_string(url).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        r#"
(async () => {{
  try {{
    const res = await fetch({url_json}, {{ credentials: 'include' }});
    const bytes = new Uint8Array(await res.arrayBuffer());
    let binary = '';
    for (let i = 0; i < bytes.length; i += 0x8000) {{
      binary += String.fromCharCode.apply(null, bytes.subarray(i, i + 0x8000));
    }}
    return btoa(binary);
  }} catch (_) {{
    return null;
  }}
}})()
"#
    )
}
