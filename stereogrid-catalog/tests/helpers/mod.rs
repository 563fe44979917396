//! Shared fixtures for stereogrid-catalog integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stereogrid_catalog::spotify::{SpotifyClient, SpotifyConfig};
use stereogrid_catalog::{build_router, AppState};
use stereogrid_common::api::{hash_token, AuthPolicy, Role, TokenEntry};
use stereogrid_common::db::{init_memory_database, SongStore};
use stereogrid_common::time::{Clock, ManualClock};
use tower::util::ServiceExt; // for `oneshot` method

pub const READER_TOKEN: &str = "reader-secret";
pub const ADMIN_TOKEN: &str = "admin-secret";
pub const CACHE_TTL: Duration = Duration::from_secs(60);

/// Router plus handles on the state behind it
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        (status, headers, extract_json(response.into_body()).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self.send(request("GET", uri, Some(READER_TOKEN), None)).await;
        (status, body)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(request("POST", uri, Some(ADMIN_TOKEN), Some(body)))
            .await;
        (status, body)
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(request("PATCH", uri, Some(ADMIN_TOKEN), Some(body)))
            .await;
        (status, body)
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(request("PUT", uri, Some(ADMIN_TOKEN), Some(body)))
            .await;
        (status, body)
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(request("DELETE", uri, Some(ADMIN_TOKEN), None))
            .await;
        (status, body)
    }

    /// Create a song through the API and return its id
    pub async fn create(&self, title: &str, artist: &str, year: i32) -> i64 {
        let (status, body) = self.post("/songs/", song_json(title, artist, year)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }
}

/// Token table with one reader and one admin token
pub fn test_policy() -> AuthPolicy {
    AuthPolicy::new(&[
        TokenEntry {
            sha256: hash_token(READER_TOKEN),
            role: Role::Reader,
        },
        TokenEntry {
            sha256: hash_token(ADMIN_TOKEN),
            role: Role::Admin,
        },
    ])
}

/// App over an empty in-memory catalog, clock pinned to 2024-06-01
pub async fn setup_app() -> TestApp {
    setup_app_with(SpotifyConfig::default(), test_policy()).await
}

pub async fn setup_app_with(spotify: SpotifyConfig, auth: AuthPolicy) -> TestApp {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ));
    let shared_clock: Arc<dyn Clock> = clock.clone();

    let pool = init_memory_database().await.unwrap();
    let spotify = SpotifyClient::new(spotify, shared_clock.clone()).unwrap();
    let state = AppState::new(SongStore::new(pool), spotify, auth, shared_clock, CACHE_TTL);

    TestApp {
        router: build_router(state.clone()),
        state,
        clock,
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Complete, valid create payload
pub fn song_json(title: &str, artist: &str, year: i32) -> Value {
    json!({
        "title": title,
        "artist": artist,
        "album": "Greatest Hits",
        "year": year,
        "duration": 215,
        "spotify_url": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC",
        "genre": "Rock"
    })
}

// =============================================================================
// Mock Spotify
// =============================================================================

pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// Local stand-in for the Spotify accounts and Web API endpoints
pub struct MockSpotify {
    pub base_url: String,
    pub token_requests: Arc<AtomicUsize>,
}

impl MockSpotify {
    pub fn config(&self) -> SpotifyConfig {
        SpotifyConfig {
            client_id: Some("test-client".to_string()),
            client_secret: Some("test-secret".to_string()),
            timeout: Duration::from_secs(5),
            accounts_url: format!("{}/api/token", self.base_url),
            api_base_url: format!("{}/v1", self.base_url),
        }
    }

    pub fn token_request_count(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MockState {
    token_requests: Arc<AtomicUsize>,
}

pub async fn start_mock_spotify() -> MockSpotify {
    let token_requests = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/token", post(mock_token))
        .route("/v1/search", get(mock_search))
        .route("/v1/tracks/:id", get(mock_track))
        .with_state(MockState {
            token_requests: token_requests.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockSpotify {
        base_url: format!("http://{}", addr),
        token_requests,
    }
}

async fn mock_token(State(state): State<MockState>, headers: HeaderMap, body: String) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);

    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !basic || body != "grant_type=client_credentials" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_client"}))).into_response();
    }

    Json(json!({
        "access_token": MOCK_ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {}", MOCK_ACCESS_TOKEN).as_str())
}

async fn mock_search(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "echo": params,
        "tracks": {"items": [{"name": "Dancing Queen"}]}
    }))
    .into_response()
}

async fn mock_track(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !bearer_ok(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id.as_str() {
        "playable1" => Json(json!({
            "id": "playable1",
            "name": "Dancing Queen",
            "artists": [{"name": "ABBA"}],
            "album": {"name": "Arrival"},
            "duration_ms": 230400,
            "external_urls": {"spotify": "https://open.spotify.com/track/playable1"},
            "is_playable": true,
            "is_local": false
        }))
        .into_response(),
        "unplayable1" => Json(json!({
            "id": "unplayable1",
            "name": "Gone",
            "artists": [{"name": "Nobody"}],
            "album": {"name": "Nothing"},
            "duration_ms": 1000,
            "external_urls": {},
            "is_playable": false
        }))
        .into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"status": 404, "message": "Non existing id"}})),
        )
            .into_response(),
    }
}
