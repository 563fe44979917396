//! Integration tests for the list/detail response cache

mod helpers;

use axum::http::StatusCode;
use helpers::{setup_app, CACHE_TTL};
use serde_json::json;
use stereogrid_common::{SongPayload, SongValidator};

/// Insert straight into the store, bypassing the handlers and their
/// invalidation
async fn insert_behind_cache(app: &helpers::TestApp, title: &str) {
    let payload: SongPayload =
        serde_json::from_value(helpers::song_json(title, "Backdoor", 2001)).unwrap();
    let song = SongValidator::new(2024).check_create(&payload).unwrap();
    app.state
        .store
        .insert(&song, app.state.clock.now())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_served_from_cache_until_ttl() {
    let app = setup_app().await;
    app.create("First", "Tester", 2000).await;

    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 1);

    insert_behind_cache(&app, "Hidden").await;

    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 1, "expected cached listing");

    app.clock
        .advance(chrono::Duration::from_std(CACHE_TTL).unwrap());

    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 2, "expected fresh listing");
}

#[tokio::test]
async fn test_write_through_api_invalidates_lists() {
    let app = setup_app().await;
    app.create("First", "Tester", 2000).await;
    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 1);

    let id = app.create("Second", "Tester", 2000).await;
    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 2);

    app.delete(&format!("/songs/{}/", id)).await;
    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 1);
}

#[tokio::test]
async fn test_update_invalidates_detail_entry() {
    let app = setup_app().await;
    let id = app.create("Before", "Tester", 2000).await;
    let uri = format!("/songs/{}/", id);

    let (_, body) = app.get(&uri).await;
    assert_eq!(body["data"]["title"], "Before");
    assert!(app.state.cache.details.get(&id).await.is_some());

    let (status, _) = app.patch(&uri, json!({"title": "After"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&uri).await;
    assert_eq!(body["data"]["title"], "After");
}

#[tokio::test]
async fn test_deleted_song_not_served_from_cache() {
    let app = setup_app().await;
    let id = app.create("Doomed", "Tester", 2000).await;
    let uri = format!("/songs/{}/", id);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);

    app.delete(&uri).await;

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_write_during_cache_miss_does_not_leave_stale_listing() {
    use stereogrid_catalog::cache::{CachedListing, ListKey};
    use stereogrid_common::api::PageInfo;
    use stereogrid_common::db::SongFilter;

    let app = setup_app().await;
    app.create("First", "Tester", 2000).await;

    // A list request misses and reads the store
    let key = ListKey {
        filter: SongFilter::default(),
        page: 1,
        page_size: 10,
    };
    let generation = app.state.cache.lists.generation();
    let songs = app.state.store.list(&key.filter, 10, 0).await.unwrap();
    let stale = CachedListing {
        songs,
        pagination: PageInfo {
            count: 1,
            page: 1,
            page_size: 10,
            total_pages: 1,
        },
    };

    // A create lands before that request fills the cache
    app.create("Second", "Tester", 2001).await;
    let stored = app
        .state
        .cache
        .lists
        .insert_if_current(generation, key, stale)
        .await;
    assert!(!stored);

    let (_, body) = app.get("/songs/").await;
    assert_eq!(body["pagination"]["count"], 2);
}
