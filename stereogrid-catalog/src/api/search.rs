//! Spotify search proxy endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use serde_json::{json, Value};
use stereogrid_common::api::Envelope;
use stereogrid_common::validation::SPOTIFY_TRACK_PREFIX;

use super::envelope_response;
use super::extract::JsonBody;
use crate::error::ApiError;
use crate::AppState;

const DEFAULT_SEARCH_TYPES: &str = "track,artist,album";
const DEFAULT_SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub types: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateUrlRequest {
    pub url: Option<String>,
}

/// GET /search?q=&type=&limit=&offset=
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Search query parameter 'q' is required".into()))?;
    let types = query
        .types
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_SEARCH_TYPES);
    let limit = parse_or(query.limit.as_deref(), DEFAULT_SEARCH_LIMIT);
    let offset = parse_or(query.offset.as_deref(), 0);

    let results = state.spotify.search(q, types, limit, offset).await?;

    Ok(envelope_response(Envelope::success(
        StatusCode::OK.as_u16(),
        results,
    )))
}

fn parse_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

/// POST /validate-url
///
/// An unusable URL is a 200 with `valid: false`; only a missing URL is a
/// client error.
pub async fn validate_url(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ValidateUrlRequest>,
) -> Result<Response, ApiError> {
    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("URL is required".into()))?;

    let verdict = match track_id_from_url(url) {
        Err(reason) => invalid(reason),
        Ok(track_id) => match state.spotify.track_details(track_id).await {
            Ok(track) => track_verdict(&track),
            Err(e) => invalid(&format!("Track not found or not accessible: {}", e)),
        },
    };

    Ok(envelope_response(Envelope::success(
        StatusCode::OK.as_u16(),
        verdict,
    )))
}

const TRACK_SEGMENT: &str = "/track/";

/// Track id of an `open.spotify.com/track/` URL
///
/// The id is the leading alphanumeric run after the first `/track/` that is
/// followed by one; anything after it (query, dashes, more path) is ignored.
pub fn track_id_from_url(url: &str) -> Result<&str, &'static str> {
    if !url.starts_with(SPOTIFY_TRACK_PREFIX) {
        return Err(
            "Invalid Spotify URL format. Must start with https://open.spotify.com/track/",
        );
    }

    url.match_indices(TRACK_SEGMENT)
        .map(|(at, _)| {
            let rest = &url[at + TRACK_SEGMENT.len()..];
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            &rest[..end]
        })
        .find(|id| !id.is_empty())
        .ok_or("Invalid track ID in Spotify URL")
}

fn invalid(reason: &str) -> Value {
    json!({ "valid": false, "error": reason })
}

fn track_verdict(track: &Value) -> Value {
    let playable = track
        .get("is_playable")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let local = track
        .get("is_local")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !playable || local {
        return invalid("Track is not available for playback");
    }

    json!({
        "valid": true,
        "track_details": {
            "name": track["name"],
            "artist": track["artists"][0]["name"],
            "album": track["album"]["name"],
            "duration_ms": track["duration_ms"],
            "external_urls": track["external_urls"],
        }
    })
}

/// GET /token
pub async fn token(State(state): State<AppState>) -> Result<Response, ApiError> {
    let token = state.spotify.access_token().await?;
    Ok(envelope_response(Envelope::success(
        StatusCode::OK.as_u16(),
        json!({ "token": token }),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_from_url() {
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
            Ok("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/abc123?si=xyz"),
            Ok("abc123")
        );
        assert_eq!(
            track_id_from_url("https://open.spotify.com/album/abc123"),
            Err("Invalid Spotify URL format. Must start with https://open.spotify.com/track/")
        );
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/"),
            Err("Invalid track ID in Spotify URL")
        );
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/-x"),
            Err("Invalid track ID in Spotify URL")
        );
    }

    #[test]
    fn test_track_id_is_leading_alphanumeric_run() {
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/ab-c"),
            Ok("ab")
        );
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/abc123/extra"),
            Ok("abc123")
        );
        // A later `/track/` segment is used when the first has no id
        assert_eq!(
            track_id_from_url("https://open.spotify.com/track/-/track/xyz9"),
            Ok("xyz9")
        );
    }

    #[test]
    fn test_track_verdict_playable() {
        let track = json!({
            "name": "Blue Monday",
            "artists": [{"name": "New Order"}],
            "album": {"name": "Power, Corruption & Lies"},
            "duration_ms": 448000,
            "external_urls": {"spotify": "https://open.spotify.com/track/x"},
            "is_playable": true
        });
        let verdict = track_verdict(&track);
        assert_eq!(verdict["valid"], true);
        assert_eq!(verdict["track_details"]["artist"], "New Order");
        assert_eq!(verdict["track_details"]["album"], "Power, Corruption & Lies");
    }

    #[test]
    fn test_track_verdict_reports_first_artist() {
        let track = json!({
            "name": "Under Pressure",
            "artists": [{"name": "Queen"}, {"name": "David Bowie"}],
            "album": {"name": "Hot Space"},
            "duration_ms": 248000,
            "external_urls": {}
        });
        let verdict = track_verdict(&track);
        assert_eq!(verdict["track_details"]["artist"], "Queen");

        let verdict = track_verdict(&json!({"name": "Untitled"}));
        assert_eq!(verdict["valid"], true);
        assert!(verdict["track_details"]["artist"].is_null());
    }

    #[test]
    fn test_track_verdict_unplayable() {
        let verdict = track_verdict(&json!({"name": "x", "is_playable": false}));
        assert_eq!(verdict["valid"], false);
        assert_eq!(verdict["error"], "Track is not available for playback");

        let verdict = track_verdict(&json!({"name": "x", "is_local": true}));
        assert_eq!(verdict["valid"], false);
    }

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or(None, 10), 10);
        assert_eq!(parse_or(Some("5"), 10), 5);
        assert_eq!(parse_or(Some("-1"), 10), 10);
    }
}
