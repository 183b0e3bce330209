mod common;

use common::{harness, quiet_config, MemoryGateway, ScriptedProvider, StubImages, PNG};
use providers::{Entry, Metadata};
use storage::BlobStore;

const COVER: &str = "https://img.example/cover.jpg";

fn blob_files(root: &std::path::Path) -> usize {
    std::fs::read_dir(root)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|d| d.path().is_dir())
        .map(|d| std::fs::read_dir(d.path()).unwrap().count())
        .sum()
}

#[tokio::test]
async fn image_is_downloaded_once_and_reused() {
    let h = harness(
        "library_fetch_once",
        quiet_config(),
        MemoryGateway::new(),
        ScriptedProvider::new(),
        StubImages::new().serve(COVER, PNG),
    )
    .await;

    let first = h.library.fetch_image(COVER).await.unwrap();
    let second = h.library.fetch_image(COVER).await.unwrap();
    assert_eq!(first, PNG);
    assert_eq!(second, first);
    assert_eq!(h.images.calls(), 1);
    assert!(h.library.cache().blobs().contains(COVER).await);
    assert_eq!(
        h.library.cache().blobs().path_for(COVER).file_name().unwrap().to_string_lossy(),
        BlobStore::key_for(COVER)
    );
}

#[tokio::test]
async fn failed_download_leaves_no_blob() {
    let h = harness(
        "library_fetch_404",
        quiet_config(),
        MemoryGateway::new(),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    assert!(h.library.fetch_image(COVER).await.is_none());
    assert_eq!(h.images.calls(), 1);
    assert!(!h.library.cache().blobs().contains(COVER).await);
    assert_eq!(blob_files(h.blobs.path()), 0);
}

#[tokio::test]
async fn non_image_payloads_are_not_cached() {
    let h = harness(
        "library_fetch_html",
        quiet_config(),
        MemoryGateway::new(),
        ScriptedProvider::new(),
        StubImages::new().serve(COVER, b"<html>rate limited</html>"),
    )
    .await;

    assert!(h.library.fetch_image(COVER).await.is_none());
    assert!(h.library.fetch_image(COVER).await.is_none());
    assert_eq!(h.images.calls(), 2);
    assert_eq!(blob_files(h.blobs.path()), 0);
}

#[tokio::test]
async fn tree_images_are_read_through_the_gateway() {
    let h = harness(
        "library_fetch_tree",
        quiet_config(),
        MemoryGateway::new().file("r/Saga/cover.png", PNG),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    assert_eq!(h.library.fetch_image("r/Saga/cover.png").await.as_deref(), Some(PNG));
    assert!(h.library.fetch_image("r/Saga/missing.png").await.is_none());
    assert!(h.library.fetch_image("").await.is_none());
    assert_eq!(h.images.calls(), 0);
}

#[tokio::test]
async fn listing_failures_surface_as_empty() {
    let h = harness(
        "library_list_failure",
        quiet_config(),
        MemoryGateway::new()
            .dir("r", &["b.zip", "A/", "a.zip"])
            .failing("broken"),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    let names: Vec<_> = h
        .library
        .list("r")
        .await
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["A", "a.zip", "b.zip"]);
    assert!(h.library.list("broken").await.is_empty());
    assert!(h.library.get_content("r/nothing.zip").await.is_empty());
}

#[tokio::test]
async fn categories_hide_adult_folders_and_expand_short_names() {
    let h = harness(
        "library_categories",
        quiet_config(),
        MemoryGateway::new().dir(
            "share",
            &["ㅂㅇ/", "성인/", "완결B/", "완결A/", "Adult Stuff/", "가나다/", "readme.txt"],
        ),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    let names: Vec<_> = h
        .library
        .categories("share")
        .await
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["완결A", "완결B", "가나다", "번역"]);
}

#[tokio::test]
async fn enrich_attaches_posters_to_a_page() {
    let h = harness(
        "library_enrich_page",
        quiet_config(),
        MemoryGateway::new()
            .dir("r", &["Great Saga/", "Nothing Here/"])
            .dir("r/Great Saga", &["01.zip"])
            .dir("r/Nothing Here", &["01.zip"]),
        ScriptedProvider::new().answer("Great Saga", COVER),
        StubImages::new(),
    )
    .await;

    let mut page = h.library.page("r", 0, 10).await.unwrap();
    h.library.enrich(&mut page.items).await;
    let first = page.items[0].metadata.clone().unwrap();
    assert_eq!(first.poster_url.as_deref(), Some(COVER));
    assert_eq!(first.title.as_deref(), Some("Great Saga"));
    assert_eq!(
        page.items[1].metadata.as_ref().and_then(|m| m.poster_url.clone()),
        None
    );
}

#[tokio::test]
async fn recent_history_round_trips_through_the_library() {
    let h = harness(
        "library_history",
        quiet_config(),
        MemoryGateway::new(),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    h.library.add_recent_search("saga").await.unwrap();
    h.library.add_recent_search("  ").await.unwrap();
    assert_eq!(h.library.recent_searches().await.unwrap(), ["saga"]);
    h.library.clear_recent_searches().await.unwrap();
    assert!(h.library.recent_searches().await.unwrap().is_empty());

    let mut entry = Entry::directory("Great Saga", "r/Great Saga");
    entry.metadata = Some(Metadata {
        poster_url: Some(COVER.into()),
        ..Metadata::default()
    });
    h.library.add_recent_comic(&entry).await.unwrap();
    let recent = h.library.recent_comics().await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].path, "r/Great Saga");
    h.library.remove_recent_comic("r/Great Saga").await.unwrap();
    assert!(h.library.recent_comics().await.unwrap().is_empty());
}

#[tokio::test]
async fn credentials_need_a_remote_gateway() {
    let h = harness(
        "library_credentials",
        quiet_config(),
        MemoryGateway::new(),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;
    assert!(!h.library.set_credentials("user", "secret"));
}

fn two_roots() -> MemoryGateway {
    MemoryGateway::new()
        .dir("a", &["A1/"])
        .dir("a/A1", &["1.zip"])
        .dir("b", &["B1/"])
        .dir("b/B1", &["1.zip"])
}

#[tokio::test]
async fn least_recently_paged_root_is_rescanned() {
    let mut cfg = quiet_config();
    cfg.scan.sessions = 1;
    let h = harness(
        "library_session_limit",
        cfg,
        two_roots(),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    let first = h.library.page("a", 0, 10).await.unwrap();
    let after_a = h.gateway.calls();
    h.library.page("a", 0, 10).await.unwrap();
    assert_eq!(h.gateway.calls(), after_a);

    h.library.page("b", 0, 10).await.unwrap();
    let after_b = h.gateway.calls();
    let again = h.library.page("a", 0, 10).await.unwrap();
    assert_eq!(again, first);
    assert!(h.gateway.calls() > after_b, "evicted root was not rescanned");
}

#[tokio::test]
async fn recently_paged_roots_stay_within_the_limit() {
    let mut cfg = quiet_config();
    cfg.scan.sessions = 2;
    let h = harness(
        "library_session_keep",
        cfg,
        two_roots(),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    h.library.page("a", 0, 10).await.unwrap();
    h.library.page("b", 0, 10).await.unwrap();
    let settled = h.gateway.calls();
    h.library.page("a", 0, 10).await.unwrap();
    h.library.page("b", 0, 10).await.unwrap();
    assert_eq!(h.gateway.calls(), settled);
}

#[tokio::test]
async fn search_uses_the_gateway_index_and_records_the_query() {
    let h = harness(
        "library_search_index",
        quiet_config(),
        MemoryGateway::new().search_index(vec![
            Entry::directory("Great Saga", "완결A/Great Saga"),
            Entry::directory("Other", "완결A/Other"),
        ]),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    let page = h.library.search("", " Saga ", 0, 100).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].path, "완결A/Great Saga");
    assert_eq!(h.gateway.calls(), 0);
    assert_eq!(h.library.recent_searches().await.unwrap(), ["Saga"]);
}

#[tokio::test]
async fn search_falls_back_to_the_walk() {
    let h = harness(
        "library_search_walk",
        quiet_config(),
        MemoryGateway::new()
            .dir("r", &["[G] Great_Saga/", "Other/"])
            .dir("r/[G] Great_Saga", &["1.zip"])
            .dir("r/Other", &["1.zip"]),
        ScriptedProvider::new(),
        StubImages::new(),
    )
    .await;

    let page = h.library.search("r", "great saga", 0, 10).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].path, "r/[G] Great_Saga");
    assert!(h.library.search("r", "great saga", 1, 10).await.unwrap().items.is_empty());

    let blank = h.library.search("r", "   ", 0, 10).await.unwrap();
    assert_eq!(blank.total, 0);
    assert_eq!(h.library.recent_searches().await.unwrap(), ["great saga"]);
}

#[tokio::test]
async fn folder_metadata_from_the_gateway_wins() {
    let h = harness(
        "library_server_metadata",
        quiet_config(),
        MemoryGateway::new().folder_metadata(
            "r/Saga",
            Metadata {
                title: Some("The Saga".into()),
                author: Some("Someone".into()),
                poster_url: Some("r/Saga/poster.png".into()),
                summary: None,
            },
        ),
        ScriptedProvider::new().answer("Saga", COVER),
        StubImages::new(),
    )
    .await;

    let meta = h
        .library
        .metadata(&Entry::directory("Saga", "r/Saga"))
        .await;
    assert_eq!(meta.title.as_deref(), Some("The Saga"));
    assert_eq!(meta.author.as_deref(), Some("Someone"));
    assert_eq!(meta.poster_url.as_deref(), Some("r/Saga/poster.png"));
    assert!(h.provider.queries().is_empty());
}

#[tokio::test]
async fn missing_server_cover_is_resolved() {
    let h = harness(
        "library_server_metadata_no_cover",
        quiet_config(),
        MemoryGateway::new().folder_metadata(
            "r/Saga",
            Metadata {
                author: Some("Someone".into()),
                ..Metadata::default()
            },
        ),
        ScriptedProvider::new().answer("Saga", COVER),
        StubImages::new(),
    )
    .await;

    let meta = h
        .library
        .metadata(&Entry::directory("Saga", "r/Saga"))
        .await;
    assert_eq!(meta.title.as_deref(), Some("Saga"));
    assert_eq!(meta.author.as_deref(), Some("Someone"));
    assert_eq!(meta.poster_url.as_deref(), Some(COVER));
    assert_eq!(h.provider.queries(), ["Saga"]);
}
