//! Dedup map and deterministic naming

use std::path::Path;
use std::sync::Arc;

use pageclone::assets::{hashed_file_name, url_digest};
use pageclone::{AssetClass, AssetRecord, AssetStore, Registration};
use proptest::prelude::*;

mod common;

#[test]
fn second_registration_keeps_first_path() {
    let store = AssetStore::new();
    let first = AssetRecord::plan("https://cdn.example.com/style.css", "text/css", AssetClass::Css, "example.com").unwrap();
    let again = AssetRecord::plan("https://cdn.example.com/style.css#print", "text/css", AssetClass::Css, "example.com").unwrap();

    let path = match store.register(first) {
        Registration::New(path) => path,
        Registration::Existing(_) => panic!("fresh store"),
    };
    assert_eq!(store.register(again), Registration::Existing(path.clone()));
    assert_eq!(store.len(), 1);
    assert_eq!(store.lookup("https://cdn.example.com/style.css"), Some(path));
}

#[test]
fn path_layout_matches_output_contract() {
    let record = AssetRecord::plan("https://example.com/img/a.png", "image/png", AssetClass::Images, "example.com").unwrap();
    let expected = Path::new("example.com")
        .join("assets")
        .join("images")
        .join(format!("{}.png", url_digest("https://example.com/img/a.png")));
    assert_eq!(record.local_path, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_installs_one_path() {
    let store = Arc::new(AssetStore::new());
    let mut tasks = Vec::new();
    for _ in 0..32 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let record = AssetRecord::plan("https://example.com/app.js", "application/javascript", AssetClass::Js, "example.com").unwrap();
            store.register(record)
        }));
    }

    let mut new_count = 0;
    let mut paths = Vec::new();
    for task in tasks {
        let registration = task.await.unwrap();
        if registration.is_new() {
            new_count += 1;
        }
        paths.push(registration.path().to_path_buf());
    }

    assert_eq!(new_count, 1);
    assert!(paths.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.len(), 1);
    assert_eq!(common::class_of(&store, "https://example.com/app.js"), AssetClass::Js);
}

#[test]
fn counts_are_grouped_by_class() {
    let store = common::store_with(&[
        ("https://example.com/a.css", "text/css"),
        ("https://example.com/b.css", "text/css"),
        ("https://example.com/logo.png", "image/png"),
    ]);
    let counts = store.counts_by_class();
    assert_eq!(counts.get("css"), Some(&2));
    assert_eq!(counts.get("images"), Some(&1));
}

proptest! {
    #[test]
    fn file_names_are_deterministic(path in "[a-z0-9/]{0,24}", query in "[a-z0-9=&]{0,12}") {
        let url = format!("https://example.com/{path}?{query}");
        let first = hashed_file_name(&url, "image/webp");
        let second = hashed_file_name(&url, "image/webp");
        prop_assert_eq!(&first, &second);
        prop_assert!(first.ends_with(".webp"));
        prop_assert_eq!(first.len(), 40 + ".webp".len());
    }

    #[test]
    fn planned_paths_are_deterministic(path in "[a-z0-9]{1,16}") {
        let url = format!("https://example.com/{path}.css");
        let a = AssetRecord::plan(&url, "text/css", AssetClass::Css, "example.com").unwrap();
        let b = AssetRecord::plan(&url, "text/css", AssetClass::Css, "example.com").unwrap();
        prop_assert_eq!(a.local_path, b.local_path);
    }
}
