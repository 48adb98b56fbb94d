//! HTML and CSS reference rewriting against a populated asset store

use std::path::{Component, Path, PathBuf};

use pageclone::assets::url_digest;
use proptest::prelude::*;
use url::Url;

mod common;
use common::{DOMAIN, rewriter_with};

fn page() -> Url {
    Url::parse("https://example.com/").unwrap()
}

/// Lexically resolve `relative` against `base_dir` (no filesystem access).
fn resolve(base_dir: &Path, relative: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base_dir.join(relative).components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

fn attribute<'a>(html: &'a str, name: &str) -> &'a str {
    let marker = format!("{name}=\"");
    let start = html.find(&marker).expect("attribute present") + marker.len();
    let len = html[start..].find('"').expect("closing quote");
    &html[start..start + len]
}

#[test]
fn duplicate_stylesheet_links_share_one_path() {
    let css_url = "https://cdn.example.com/style.css";
    let rewriter = rewriter_with(&[(css_url, "text/css")]);
    let html = format!(
        r#"<head><link rel="stylesheet" href="{css_url}"><link rel="stylesheet" href="{css_url}"></head>"#
    );

    let out = rewriter.rewrite_html(&html, &page(), Path::new(DOMAIN)).unwrap();

    let expected = format!("assets/css/{}.css", url_digest(css_url));
    assert_eq!(out.rewritten, 2);
    assert_eq!(out.text.matches(&format!(r#"href="{expected}""#)).count(), 2);
    assert!(!out.text.contains(css_url));
}

#[test]
fn css_background_points_from_css_dir_to_images() {
    let rewriter = rewriter_with(&[("https://example.com/img/a.png", "image/png")]);
    let css = "body { background: url('/img/a.png') no-repeat; }";
    let css_dir = Path::new(DOMAIN).join("assets").join("css");

    let out = rewriter.rewrite_css(
        css,
        &Url::parse("https://example.com/styles/site.css").unwrap(),
        &css_dir,
    );

    let expected = format!(
        "body {{ background: url(../images/{}.png) no-repeat; }}",
        url_digest("https://example.com/img/a.png")
    );
    assert_eq!(out.text, expected);
    assert_eq!(
        resolve(&css_dir, &format!("../images/{}.png", url_digest("https://example.com/img/a.png"))),
        common::local_path(rewriter.store(), "https://example.com/img/a.png")
    );
}

#[test]
fn srcset_rewrites_only_captured_candidates() {
    let rewriter = rewriter_with(&[("https://example.com/a.jpg", "image/jpeg")]);
    let html = r#"<img srcset="a.jpg 1x, b.jpg 2x">"#;

    let out = rewriter.rewrite_html(html, &page(), Path::new(DOMAIN)).unwrap();

    let expected = format!(
        r#"<img srcset="assets/images/{}.jpg 1x, b.jpg 2x">"#,
        url_digest("https://example.com/a.jpg")
    );
    assert_eq!(out.text, expected);
    assert_eq!(out.rewritten, 1);
}

#[test]
fn uncaptured_references_are_untouched() {
    let rewriter = rewriter_with(&[("https://example.com/known.js", "application/javascript")]);
    let html = concat!(
        "<!doctype html><html><head>\n",
        "<link rel=icon href='/favicon.ico'>\n",
        "<style>/* url(/x.png) */ .a { background: url( \"/missing.png\" ) }</style>\n",
        "</head><body style=\"background:url(/bg.png)\">\n",
        "<a href=\"#top\">top</a> <a href=\"javascript:void(0)\">js</a>\n",
        "<img src=\"data:image/png;base64,AAAA\" srcset=\"x.png 1x,y.png 2x\">\n",
        "</body></html>"
    );

    let out = rewriter.rewrite_html(html, &page(), Path::new(DOMAIN)).unwrap();

    assert_eq!(out.rewritten, 0);
    assert_eq!(out.text, html);
}

#[test]
fn inline_styles_are_rewritten() {
    let rewriter = rewriter_with(&[("https://example.com/bg.png", "image/png")]);
    let html = r#"<div style="background: url(/bg.png)"></div><style>.x{background:url("bg.png")}</style>"#;

    let out = rewriter.rewrite_html(html, &page(), Path::new(DOMAIN)).unwrap();

    let local = format!("assets/images/{}.png", url_digest("https://example.com/bg.png"));
    assert_eq!(out.rewritten, 2);
    assert!(out.text.contains(&format!(r#"style="background: url({local})""#)));
    assert!(out.text.contains(&format!(".x{{background:url({local})}}")));
}

#[test]
fn entity_encoded_queries_match_captured_urls() {
    let url = "https://example.com/a.png?x=1&y=2";
    let rewriter = rewriter_with(&[(url, "image/png")]);
    let html = r#"<img src="/a.png?x=1&amp;y=2"><img srcset="/a.png?x=1&amp;y=2 1x, /b.png?x=1&amp;y=2 2x">"#;

    let out = rewriter.rewrite_html(html, &page(), Path::new(DOMAIN)).unwrap();

    let local = format!("assets/images/{}.png", url_digest(url));
    assert_eq!(out.rewritten, 2);
    assert_eq!(
        out.text,
        format!(r#"<img src="{local}"><img srcset="{local} 1x, /b.png?x=1&amp;y=2 2x">"#)
    );
}

#[test]
fn unterminated_escape_in_style_is_left_alone() {
    let rewriter = rewriter_with(&[("https://example.com/bg.png", "image/png")]);
    let html = r#"<div style="background:url(x\"></div><style>a{b:url(x\</style>"#;

    let out = rewriter.rewrite_html(html, &page(), Path::new(DOMAIN)).unwrap();

    assert_eq!(out.rewritten, 0);
    assert_eq!(out.text, html);
}

#[test]
fn fragments_survive_rewriting() {
    let rewriter = rewriter_with(&[("https://example.com/sprite.svg", "image/svg+xml")]);
    let html = r##"<a href="/sprite.svg#icon">i</a><a href="#icon">j</a>"##;

    let out = rewriter.rewrite_html(html, &page(), Path::new(DOMAIN)).unwrap();

    let local = format!("assets/images/{}.svg", url_digest("https://example.com/sprite.svg"));
    assert!(out.text.contains(&format!(r##"href="{local}#icon""##)));
    assert!(out.text.contains(r##"href="#icon""##));
}

#[test]
fn import_strings_are_rewritten() {
    let rewriter = rewriter_with(&[("https://example.com/css/reset.css", "text/css")]);
    let css = r#"@import "reset.css"; @import url(other.css);"#;
    let css_dir = Path::new(DOMAIN).join("assets").join("css");

    let out = rewriter.rewrite_css(css, &Url::parse("https://example.com/css/main.css").unwrap(), &css_dir);

    let expected = format!(
        r#"@import "{}.css"; @import url(other.css);"#,
        url_digest("https://example.com/css/reset.css")
    );
    assert_eq!(out.text, expected);
}

proptest! {
    #[test]
    fn rewritten_paths_resolve_to_stored_paths(
        segments in prop::collection::vec("[a-z0-9]{1,8}", 1..4),
        ext in prop::sample::select(vec![("png", "image/png"), ("css", "text/css"), ("js", "application/javascript")]),
    ) {
        let url = format!("https://example.com/{}.{}", segments.join("/"), ext.0);
        let rewriter = rewriter_with(&[(url.as_str(), ext.1)]);
        let stored = common::local_path(rewriter.store(), &url);

        for base_dir in [PathBuf::from(DOMAIN), Path::new(DOMAIN).join("assets").join("css")] {
            let html = format!(r#"<script src="/{}.{}"></script>"#, segments.join("/"), ext.0);
            let out = rewriter.rewrite_html(&html, &page(), &base_dir).unwrap();
            let emitted = attribute(&out.text, "src");
            prop_assert_eq!(resolve(&base_dir, emitted), stored.clone());
        }
    }

    #[test]
    fn documents_without_captures_are_unchanged(
        name in "[a-z]{1,10}",
        alt in "[ a-zA-Z0-9.,]{0,20}",
    ) {
        let rewriter = rewriter_with(&[]);
        let html = format!(r#"<p><img src="/{name}.png" alt="{alt}"><a href="{name}.html">{alt}</a></p>"#);
        let out = rewriter.rewrite_html(&html, &page(), Path::new(DOMAIN)).unwrap();
        prop_assert_eq!(out.text, html);
    }
}
