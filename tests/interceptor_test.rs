//! Saving response bodies: dedup, layout and document rewriting

use pageclone::assets::url_digest;
use pageclone::capture::write_entry_document;

mod common;
use common::{DOMAIN, interceptor_in_tempdir};

#[tokio::test]
async fn same_url_is_written_once() {
    let (dir, interceptor) = interceptor_in_tempdir();
    let url = "https://cdn.example.com/style.css";

    let first = interceptor
        .persist(url, "text/css", b"body{}".to_vec())
        .await
        .unwrap();
    let second = interceptor
        .persist(url, "text/css; charset=utf-8", b"body{color:red}".to_vec())
        .await
        .unwrap();

    let path = first.expect("first capture writes");
    assert!(second.is_none());
    assert_eq!(common::count_files(&dir.path().join(DOMAIN).join("assets").join("css")), 1);
    assert_eq!(std::fs::read_to_string(dir.path().join(&path)).unwrap(), "body{}");
}

#[tokio::test]
async fn binary_bodies_are_written_verbatim() {
    let (dir, interceptor) = interceptor_in_tempdir();
    let body = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3];

    let path = interceptor
        .persist("https://example.com/logo.png", "image/png", body.clone())
        .await
        .unwrap()
        .unwrap();

    assert!(path.starts_with(format!("{DOMAIN}/assets/images")));
    assert_eq!(std::fs::read(dir.path().join(path)).unwrap(), body);
}

#[tokio::test]
async fn stylesheet_references_earlier_capture_relatively() {
    let (dir, interceptor) = interceptor_in_tempdir();
    interceptor
        .persist("https://example.com/img/a.png", "image/png", vec![1, 2, 3])
        .await
        .unwrap();

    let css_path = interceptor
        .persist(
            "https://example.com/css/site.css",
            "text/css",
            b"body { background: url('/img/a.png'); } .b { background: url(/img/b.png); }".to_vec(),
        )
        .await
        .unwrap()
        .unwrap();

    let saved = std::fs::read_to_string(dir.path().join(css_path)).unwrap();
    let image = format!("../images/{}.png", url_digest("https://example.com/img/a.png"));
    assert_eq!(
        saved,
        format!("body {{ background: url({image}); }} .b {{ background: url(/img/b.png); }}")
    );
}

#[tokio::test]
async fn embedded_data_in_captured_html_resolves_from_its_directory() {
    let (dir, interceptor) = interceptor_in_tempdir();

    let html_path = interceptor
        .persist(
            "https://example.com/frame.html",
            "text/html",
            br#"<img src="data:image/png;base64,AAAA">"#.to_vec(),
        )
        .await
        .unwrap()
        .unwrap();

    let saved = std::fs::read_to_string(dir.path().join(&html_path)).unwrap();
    assert_eq!(saved, r#"<img src="embedded/html_embedded_1.png">"#);
    let html_dir = dir.path().join(html_path.parent().unwrap());
    assert!(html_dir.join("embedded").join("html_embedded_1.png").is_file());
}

#[tokio::test]
async fn entry_document_is_rewritten_against_the_domain_dir() {
    let (dir, interceptor) = interceptor_in_tempdir();
    interceptor
        .persist("https://example.com/app.js", "application/javascript", b"1".to_vec())
        .await
        .unwrap();

    let html = concat!(
        r#"<html><head><script src="/app.js"></script><script src="https://cdn.other.net/x.js"></script></head>"#,
        r#"<body><img src="data:image/png;base64,AAAA"></body></html>"#
    );
    let index = write_entry_document(&interceptor, html, "https://example.com/").await.unwrap();

    assert_eq!(index, dir.path().join(DOMAIN).join("index.html"));
    let saved = std::fs::read_to_string(&index).unwrap();
    assert!(saved.contains(&format!(
        r#"<script src="assets/js/{}.js">"#,
        url_digest("https://example.com/app.js")
    )));
    assert!(saved.contains(r#"<script src="https://cdn.other.net/x.js">"#));
    assert!(saved.contains(r#"<img src="assets/html/embedded/html_embedded_1.png">"#));
    assert!(
        dir.path()
            .join(DOMAIN)
            .join("assets/html/embedded/html_embedded_1.png")
            .is_file()
    );
}

#[tokio::test]
async fn snapshot_embedded_data_replaces_the_response_payload() {
    let (dir, interceptor) = interceptor_in_tempdir();
    interceptor
        .persist(
            "https://example.com/",
            "text/html",
            br#"<img src="data:image/png;base64,AAAA">"#.to_vec(),
        )
        .await
        .unwrap()
        .unwrap();

    let index = write_entry_document(
        &interceptor,
        r#"<img src="data:image/png;base64,/w==">"#,
        "https://example.com/",
    )
    .await
    .unwrap();

    let embedded = dir.path().join(DOMAIN).join("assets/html/embedded/html_embedded_1.png");
    assert_eq!(std::fs::read(&embedded).unwrap(), vec![0xff]);
    let saved = std::fs::read_to_string(&index).unwrap();
    assert!(saved.contains(r#"<img src="assets/html/embedded/html_embedded_1.png">"#));
}
