//! Song CRUD endpoints
//!
//! Each write handler runs the validation pipeline, performs exactly one
//! store mutation, then drops the cache entries that mutation made stale.
//! A rejected write never touches the store.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;
use stereogrid_common::api::{Envelope, Links, PageInfo};
use stereogrid_common::db::SongFilter;
use stereogrid_common::{Song, SongPayload, SongValidator};
use tracing::info;

use super::extract::JsonBody;
use super::{envelope_response, request_origin};
use crate::cache::{CachedListing, ListKey};
use crate::error::ApiError;
use crate::pagination::{calculate_pagination, resolve_page, resolve_page_size};
use crate::AppState;

const SONG_NOT_FOUND: &str = "Song not found";

/// Query parameters for the song list
///
/// Kept as raw strings so malformed numbers can be reported in the
/// envelope (filters) or replaced by defaults (pagination).
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub decade: Option<String>,
    pub year: Option<String>,
    pub year_min: Option<String>,
    pub year_max: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListQuery {
    pub fn filter(&self) -> Result<SongFilter, ApiError> {
        Ok(SongFilter {
            title: non_empty(&self.title),
            artist: non_empty(&self.artist),
            genre: non_empty(&self.genre),
            decade: non_empty(&self.decade),
            year: parse_year("year", &self.year)?,
            year_min: parse_year("year_min", &self.year_min)?,
            year_max: parse_year("year_max", &self.year_max)?,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_year(name: &str, value: &Option<String>) -> Result<Option<i32>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("{} must be an integer", name))),
    }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::NotFound(SONG_NOT_FOUND.to_string()))
}

fn song_value(song: &Song) -> Result<Value, ApiError> {
    serde_json::to_value(song).map_err(|e| ApiError::Internal(e.to_string()))
}

fn song_links(headers: &HeaderMap, song: &Song) -> Links {
    Links {
        collection: format!("{}/songs/", request_origin(headers)),
        spotify: song.spotify_url.clone(),
    }
}

/// GET /songs/
///
/// Filtered, paginated list, newest first.
pub async fn list_songs(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let filter = query.filter()?;
    let page_size = resolve_page_size(query.page_size.as_deref());
    let key = ListKey {
        filter,
        page: resolve_page(query.page.as_deref()),
        page_size,
    };

    let listing = match state.cache.lists.get(&key).await {
        Some(listing) => listing,
        None => {
            let generation = state.cache.lists.generation();
            let total = state.store.count(&key.filter).await?;
            let pagination = calculate_pagination(total, key.page, page_size);
            let songs = state
                .store
                .list(&key.filter, pagination.page_size, pagination.offset)
                .await?;

            let listing = CachedListing {
                songs,
                pagination: PageInfo {
                    count: total,
                    page: pagination.page,
                    page_size: pagination.page_size,
                    total_pages: pagination.total_pages,
                },
            };
            state
                .cache
                .lists
                .insert_if_current(generation, key, listing.clone())
                .await;
            listing
        }
    };

    let data = serde_json::to_value(&listing.songs).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(envelope_response(
        Envelope::success(StatusCode::OK.as_u16(), data).with_pagination(listing.pagination),
    ))
}

/// GET /songs/:id/
pub async fn get_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;

    let song = match state.cache.details.get(&id).await {
        Some(song) => song,
        None => {
            let generation = state.cache.details.generation();
            let song = state
                .store
                .get(id)
                .await?
                .ok_or_else(|| ApiError::NotFound(SONG_NOT_FOUND.to_string()))?;
            state
                .cache
                .details
                .insert_if_current(generation, id, song.clone())
                .await;
            song
        }
    };

    Ok(envelope_response(
        Envelope::success(StatusCode::OK.as_u16(), song_value(&song)?)
            .with_links(song_links(&headers, &song)),
    ))
}

/// POST /songs/
pub async fn create_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<SongPayload>,
) -> Result<Response, ApiError> {
    let validator = SongValidator::from_clock(state.clock.as_ref());
    let candidate = validator.validate_create(&payload, &state.store).await?;

    let song = state.store.insert(&candidate, state.clock.now()).await?;
    state.cache.invalidate_song(song.id).await;
    info!(id = song.id, title = %song.title, artist = %song.artist, "Song created");

    Ok(envelope_response(
        Envelope::success(StatusCode::CREATED.as_u16(), song_value(&song)?)
            .with_message("Song created successfully")
            .with_links(song_links(&headers, &song)),
    ))
}

/// PUT|PATCH /songs/:id/
///
/// Both verbs merge the payload over the stored record; omitted fields keep
/// their values and every validator runs against the merged result.
pub async fn update_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<SongPayload>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let existing = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(SONG_NOT_FOUND.to_string()))?;

    let validator = SongValidator::from_clock(state.clock.as_ref());
    let candidate = validator
        .validate_update(&existing, &payload, &state.store)
        .await?;

    let song = state.store.update(id, &candidate, state.clock.now()).await?;
    state.cache.invalidate_song(id).await;
    info!(id = id, "Song updated");

    Ok(envelope_response(
        Envelope::success(StatusCode::OK.as_u16(), song_value(&song)?)
            .with_message("Song updated successfully")
            .with_links(song_links(&headers, &song)),
    ))
}

/// DELETE /songs/:id/
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;

    if !state.store.delete(id).await? {
        return Err(ApiError::NotFound(SONG_NOT_FOUND.to_string()));
    }
    state.cache.invalidate_song(id).await;
    info!(id = id, "Song deleted");

    Ok(envelope_response(Envelope::acknowledged(
        StatusCode::OK.as_u16(),
        "Song deleted successfully",
    )))
}
