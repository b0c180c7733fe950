//! Integration tests for the sync loop
//!
//! These tests run the full engine against a wiremock server standing in
//! for both the listing and the metadata API, persisting into a temporary
//! SQLite database.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use kagami::catalog::CatalogClient;
use kagami::storage::{CatalogStore, SqliteStore};
use kagami::sync::SyncEngine;

/// Renders one listing row the extractor will match.
fn listing_row(gid: i64, token: &str, posted: &str) -> String {
    format!(
        r#"<tr><td><a href="/t.php?gid={}&t={}">dl</a></td><td>{}</td></tr>"#,
        gid, token, posted
    )
}

/// Renders a listing page for the given (gid, posted) pairs, newest first.
fn listing_body(entries: &[(i64, &str)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(gid, posted)| listing_row(*gid, "aaaaaaaaaa", posted))
        .collect();
    format!("<html><body><table>{}</table></body></html>", rows)
}

/// Metadata API stand-in: answers any gidlist with fabricated records, one
/// per requested gid. Posted timestamps derive from the gid so every record
/// is distinct and deterministic. Chunks containing `fail_gid` get a 500.
struct GdataResponder {
    fail_gid: Option<i64>,
}

impl GdataResponder {
    fn new() -> Self {
        Self { fail_gid: None }
    }

    fn failing_on(gid: i64) -> Self {
        Self { fail_gid: Some(gid) }
    }
}

impl Respond for GdataResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let payload: serde_json::Value =
            serde_json::from_slice(&request.body).expect("API request body is JSON");
        assert_eq!(payload["method"], "gdata");
        assert_eq!(payload["namespace"], 1);

        let gidlist = payload["gidlist"].as_array().expect("gidlist is an array");

        if let Some(fail) = self.fail_gid {
            if gidlist.iter().any(|pair| pair[0].as_i64() == Some(fail)) {
                return ResponseTemplate::new(500);
            }
        }

        let records: Vec<serde_json::Value> = gidlist
            .iter()
            .map(|pair| {
                let gid = pair[0].as_i64().expect("gid is numeric");
                json!({
                    "gid": gid,
                    "token": pair[1],
                    "title": format!("Gallery {}", gid),
                    "category": "Misc",
                    "uploader": "someone",
                    "posted": (1_700_000_000 + gid).to_string(),
                    "filecount": "10",
                    "filesize": 4096,
                    "expunged": false,
                    "rating": "4.5",
                    "torrentcount": "1",
                    "torrents": [{
                        "hash": format!("hash{}", gid),
                        "added": "2024-01-15",
                        "name": format!("bundle {}", gid),
                        "tsize": "10",
                        "fsize": "10 MiB"
                    }],
                    "tags": ["artist:someone", "language:english"]
                })
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "gmetadata": records }))
    }
}

/// Mounts a listing page for one cursor value.
async fn mount_listing(server: &MockServer, cursor: i64, body: String) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("prev", cursor.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn engine_for(
    server: &MockServer,
    store: SqliteStore,
    retry_count: u32,
) -> SyncEngine<SqliteStore> {
    let client = CatalogClient::new(
        server.uri(),
        format!("{}/api.php", server.uri()),
        None,
        retry_count,
    )
    .expect("client builds");
    SyncEngine::new(client, store, 0, 0)
}

#[tokio::test]
async fn test_full_sync_loop() {
    let server = MockServer::start().await;

    // First page: three entries newest-first, with gid 480 repeated (a
    // pagination boundary artifact the walker must deduplicate). The next
    // fetch asks for entries before 500 and finds none.
    let page = listing_body(&[
        (500, "2024-01-15 12:00"),
        (480, "2024-01-15 11:30"),
        (480, "2024-01-15 11:30"),
        (460, "2024-01-15 11:00"),
    ]);
    mount_listing(&server, 0, page).await;
    mount_listing(&server, 500, listing_body(&[])).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .respond_with(GdataResponder::new())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mirror.db");
    let store = SqliteStore::open(&db_path).unwrap();

    let mut engine = engine_for(&server, store, 3);
    let outcome = engine.run().await.expect("sync completes");

    assert_eq!(outcome.pages, 1);
    assert_eq!(outcome.listed_entries, 3, "duplicate gid must be dropped");
    assert_eq!(outcome.ingested_records, 3);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.count_galleries().unwrap(), 3);

    let row = store.get_gallery(500).unwrap().expect("gallery 500 stored");
    assert_eq!(row.title, "Gallery 500");
    assert_eq!(row.posted, 1_700_000_500);
    assert_eq!(row.filecount, 10);
    assert_eq!(store.count_torrents(500).unwrap(), 1);
    assert_eq!(
        store.tags_for(500).unwrap(),
        vec!["artist:someone".to_string(), "language:english".to_string()]
    );

    // The cursor advanced to the first (newest) entry of the page: the
    // second listing request asked for entries before gid 500.
    let listing_cursors: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/")
        .map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "prev")
                .map(|(_, value)| value.into_owned())
                .expect("listing request carries prev")
        })
        .collect();
    assert_eq!(listing_cursors, vec!["0".to_string(), "500".to_string()]);
}

#[tokio::test]
async fn test_rerun_resumes_from_newest_stored_gid() {
    let server = MockServer::start().await;

    mount_listing(
        &server,
        0,
        listing_body(&[(500, "2024-01-15 12:00"), (460, "2024-01-15 11:00")]),
    )
    .await;
    mount_listing(&server, 500, listing_body(&[])).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .respond_with(GdataResponder::new())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mirror.db");

    let mut engine = engine_for(&server, SqliteStore::open(&db_path).unwrap(), 3);
    let first = engine.run().await.expect("first run completes");
    assert_eq!(first.ingested_records, 2);

    // The second run starts at the newest stored gid, immediately sees an
    // empty page, and changes nothing.
    let mut engine = engine_for(&server, SqliteStore::open(&db_path).unwrap(), 3);
    let second = engine.run().await.expect("second run completes");
    assert_eq!(second.pages, 0);
    assert_eq!(second.ingested_records, 0);

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.count_galleries().unwrap(), 2);
}

#[tokio::test]
async fn test_batch_partitioning_and_failure_isolation() {
    let server = MockServer::start().await;

    // 57 entries: chunks of 25, 25, and 7. The middle chunk (gids
    // 1031..=1007) is served a 500 on every attempt and must not block the
    // other two.
    let entries: Vec<(i64, &str)> = (0..57).map(|i| (1056 - i, "2024-01-15 12:00")).collect();
    mount_listing(&server, 0, listing_body(&entries)).await;
    mount_listing(&server, 1056, listing_body(&[])).await;

    Mock::given(method("POST"))
        .and(path("/api.php"))
        .respond_with(GdataResponder::failing_on(1031))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mirror.db");

    let mut engine = engine_for(&server, SqliteStore::open(&db_path).unwrap(), 1);
    let outcome = engine.run().await.expect("sync completes");

    assert_eq!(outcome.listed_entries, 57);
    assert_eq!(outcome.ingested_records, 32, "only the failed chunk is lost");

    let store = SqliteStore::open(&db_path).unwrap();
    assert_eq!(store.count_galleries().unwrap(), 32);
    assert!(store.get_gallery(1056).unwrap().is_some());
    assert!(store.get_gallery(1000).unwrap().is_some());
    assert!(store.get_gallery(1031).unwrap().is_none());
    assert!(store.get_gallery(1020).unwrap().is_none());

    // Exactly three API calls were made, sized 25/25/7 in request order.
    let batch_sizes: Vec<usize> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/api.php")
        .map(|request| {
            let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            payload["gidlist"].as_array().unwrap().len()
        })
        .collect();
    assert_eq!(batch_sizes, vec![25, 25, 7]);
}

#[tokio::test]
async fn test_empty_catalog_terminates_immediately() {
    let server = MockServer::start().await;
    mount_listing(&server, 0, listing_body(&[])).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mirror.db");

    let mut engine = engine_for(&server, SqliteStore::open(&db_path).unwrap(), 3);
    let outcome = engine.run().await.expect("empty page is a clean stop");

    assert_eq!(outcome.pages, 0);
    assert_eq!(outcome.listed_entries, 0);
    assert_eq!(outcome.ingested_records, 0);
}

#[tokio::test]
async fn test_listing_retry_exhaustion_aborts_run() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mirror.db");

    let mut engine = engine_for(&server, SqliteStore::open(&db_path).unwrap(), 2);
    let result = engine.run().await;

    assert!(matches!(result, Err(kagami::KagamiError::Status { status: 500, .. })));

    // Both budgeted attempts were spent before giving up.
    let listing_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/")
        .count();
    assert_eq!(listing_requests, 2);
}
