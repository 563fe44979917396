//! Validation and uniqueness rules for song writes
//!
//! Every create and update runs the same pipeline:
//!
//! 1. Resolve the candidate: on create the payload itself, on update the
//!    payload overlaid on the stored record (omitted fields keep their
//!    stored values).
//! 2. Field checks in a fixed order: title, artist, album, year, duration,
//!    Spotify URL, cover URL, genre.
//! 3. The (title, artist) uniqueness probe against every *other* record.
//!
//! The first failing check is the only one reported; later checks are not
//! evaluated. On success the result is a [`ValidatedSong`] with normalized
//! text and the decade recomputed from the year.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::model::{decade_for_year, Decade, Genre, Song, MIN_YEAR};
use crate::time::Clock;

/// Longest accepted song length in seconds
pub const MAX_DURATION_SECS: i64 = 3600;

/// Every source URL must start with this
pub const SPOTIFY_TRACK_PREFIX: &str = "https://open.spotify.com/track/";

const COVER_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

const MAX_TITLE_LEN: usize = 100;
const MAX_ARTIST_LEN: usize = 100;
const MAX_ALBUM_LEN: usize = 255;
const MAX_URL_LEN: usize = 1000;

/// Why a song write was refused
///
/// Display output is the human-readable message returned to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} may not be blank")]
    BlankField { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Invalid year: must be a whole number between 1970 and {max_year}")]
    InvalidYear { max_year: i32 },

    #[error("Duration must be a whole number of seconds")]
    InvalidDuration,

    #[error("Duration must be greater than 0 seconds")]
    NonPositiveDuration,

    #[error("Duration cannot exceed 3600 seconds")]
    DurationTooLong,

    #[error("Spotify URL is required")]
    MissingSourceUrl,

    #[error("Invalid Spotify URL: must start with https://open.spotify.com/track/")]
    InvalidSourceUrlFormat,

    #[error("Cover art URL must be an http(s) link ending in .jpg, .jpeg, .png or .gif")]
    InvalidCoverUrlFormat,

    #[error("'{value}' is not a valid genre")]
    InvalidGenre { value: String },

    #[error("A song titled '{title}' by '{artist}' already exists")]
    DuplicateTitleArtist { title: String, artist: String },
}

impl Rejection {
    /// Stable name of the rejection kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::MissingField { .. } => "MissingField",
            Rejection::BlankField { .. } => "BlankField",
            Rejection::FieldTooLong { .. } => "FieldTooLong",
            Rejection::InvalidYear { .. } => "InvalidYear",
            Rejection::InvalidDuration => "InvalidDuration",
            Rejection::NonPositiveDuration => "NonPositiveDuration",
            Rejection::DurationTooLong => "DurationTooLong",
            Rejection::MissingSourceUrl => "MissingSourceUrl",
            Rejection::InvalidSourceUrlFormat => "InvalidSourceUrlFormat",
            Rejection::InvalidCoverUrlFormat => "InvalidCoverUrlFormat",
            Rejection::InvalidGenre { .. } => "InvalidGenre",
            Rejection::DuplicateTitleArtist { .. } => "DuplicateTitleArtist",
        }
    }
}

/// Incoming song fields, any of which may be omitted
///
/// `year` and `duration` are kept as raw JSON so that numeric strings
/// (`"2024"`) are accepted and anything else becomes a rejection rather than
/// a deserialization failure. Read-only fields (`id`, `decade`, timestamps)
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongPayload {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<Value>,
    pub duration: Option<Value>,
    pub spotify_url: Option<String>,
    /// `None` = omitted, `Some(None)` = explicitly cleared
    #[serde(default, deserialize_with = "nullable")]
    pub cover_art_url: Option<Option<String>>,
    pub genre: Option<String>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SongPayload {
    /// Payload carrying every field of a stored song
    pub fn from_song(song: &Song) -> Self {
        Self {
            title: Some(song.title.clone()),
            artist: Some(song.artist.clone()),
            album: Some(song.album.clone()),
            year: Some(Value::from(song.year)),
            duration: Some(Value::from(song.duration)),
            spotify_url: Some(song.spotify_url.clone()),
            cover_art_url: Some(song.cover_art_url.clone()),
            genre: Some(song.genre.as_str().to_string()),
        }
    }

    /// Fields present in `self` win; omitted ones come from `base`
    pub fn overlay(&self, base: &SongPayload) -> SongPayload {
        SongPayload {
            title: self.title.clone().or_else(|| base.title.clone()),
            artist: self.artist.clone().or_else(|| base.artist.clone()),
            album: self.album.clone().or_else(|| base.album.clone()),
            year: self.year.clone().or_else(|| base.year.clone()),
            duration: self.duration.clone().or_else(|| base.duration.clone()),
            spotify_url: self.spotify_url.clone().or_else(|| base.spotify_url.clone()),
            cover_art_url: self
                .cover_art_url
                .clone()
                .or_else(|| base.cover_art_url.clone()),
            genre: self.genre.clone().or_else(|| base.genre.clone()),
        }
    }
}

/// Normalized field set ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    pub duration: i32,
    pub spotify_url: String,
    pub cover_art_url: Option<String>,
    pub genre: Genre,
    pub decade: Decade,
}

/// Store lookup needed by the uniqueness rule
#[async_trait]
pub trait UniquenessProbe: Send + Sync {
    /// Id of a record other than `exclude_id` with exactly this
    /// (title, artist), if one exists
    async fn find_title_artist_conflict(
        &self,
        title: &str,
        artist: &str,
        exclude_id: Option<i64>,
    ) -> crate::Result<Option<i64>>;
}

/// Validation engine for one request
///
/// Holds the year upper bound in effect for the request; it carries no
/// other state.
#[derive(Debug, Clone, Copy)]
pub struct SongValidator {
    max_year: i32,
}

impl SongValidator {
    pub fn new(max_year: i32) -> Self {
        Self { max_year }
    }

    /// Validator bounding the year by the clock's current calendar year
    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.current_year())
    }

    /// Field checks for a new song; every required field must be present
    pub fn check_create(&self, payload: &SongPayload) -> Result<ValidatedSong, Rejection> {
        self.check_fields(payload)
    }

    /// Field checks for an update of `existing`; omitted fields keep their
    /// stored values and all validators run against the merged record
    pub fn check_update(
        &self,
        existing: &Song,
        payload: &SongPayload,
    ) -> Result<ValidatedSong, Rejection> {
        let merged = payload.overlay(&SongPayload::from_song(existing));
        self.check_fields(&merged)
    }

    /// Full pipeline for a create
    pub async fn validate_create(
        &self,
        payload: &SongPayload,
        probe: &dyn UniquenessProbe,
    ) -> crate::Result<ValidatedSong> {
        let song = self.check_create(payload)?;
        ensure_unique(&song, None, probe).await?;
        Ok(song)
    }

    /// Full pipeline for an update of `existing`
    pub async fn validate_update(
        &self,
        existing: &Song,
        payload: &SongPayload,
        probe: &dyn UniquenessProbe,
    ) -> crate::Result<ValidatedSong> {
        let song = self.check_update(existing, payload)?;
        ensure_unique(&song, Some(existing.id), probe).await?;
        Ok(song)
    }

    fn check_fields(&self, candidate: &SongPayload) -> Result<ValidatedSong, Rejection> {
        let title = required_text("title", candidate.title.as_deref(), MAX_TITLE_LEN)?;
        let artist = required_text("artist", candidate.artist.as_deref(), MAX_ARTIST_LEN)?;
        let album = required_text("album", candidate.album.as_deref(), MAX_ALBUM_LEN)?;
        let year = self.check_year(candidate.year.as_ref())?;
        let duration = check_duration(candidate.duration.as_ref())?;
        let spotify_url = check_spotify_url(candidate.spotify_url.as_deref())?;
        let cover_art_url = check_cover_url(candidate.cover_art_url.as_ref())?;
        let genre = check_genre(candidate.genre.as_deref())?;

        Ok(ValidatedSong {
            title,
            artist,
            album,
            year,
            duration,
            spotify_url,
            cover_art_url,
            genre,
            decade: decade_for_year(year),
        })
    }

    fn check_year(&self, value: Option<&Value>) -> Result<i32, Rejection> {
        let invalid = Rejection::InvalidYear {
            max_year: self.max_year,
        };
        let value = value.ok_or(Rejection::MissingField { field: "year" })?;
        let year = parse_integer(value).ok_or_else(|| invalid.clone())?;
        if year < i64::from(MIN_YEAR) || year > i64::from(self.max_year) {
            return Err(invalid);
        }
        Ok(year as i32)
    }
}

async fn ensure_unique(
    song: &ValidatedSong,
    exclude_id: Option<i64>,
    probe: &dyn UniquenessProbe,
) -> crate::Result<()> {
    let conflict = probe
        .find_title_artist_conflict(&song.title, &song.artist, exclude_id)
        .await?;
    if conflict.is_some() {
        return Err(Rejection::DuplicateTitleArtist {
            title: song.title.clone(),
            artist: song.artist.clone(),
        }
        .into());
    }
    Ok(())
}

fn required_text(field: &'static str, value: Option<&str>, max: usize) -> Result<String, Rejection> {
    let value = value.ok_or(Rejection::MissingField { field })?.trim();
    if value.is_empty() {
        return Err(Rejection::BlankField { field });
    }
    if value.chars().count() > max {
        return Err(Rejection::FieldTooLong { field, max });
    }
    Ok(value.to_string())
}

fn check_duration(value: Option<&Value>) -> Result<i32, Rejection> {
    let value = value.ok_or(Rejection::MissingField { field: "duration" })?;
    let duration = parse_integer(value).ok_or(Rejection::InvalidDuration)?;
    if duration <= 0 {
        return Err(Rejection::NonPositiveDuration);
    }
    if duration > MAX_DURATION_SECS {
        return Err(Rejection::DurationTooLong);
    }
    Ok(duration as i32)
}

fn check_spotify_url(value: Option<&str>) -> Result<String, Rejection> {
    let url = value.map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(Rejection::MissingSourceUrl);
    }
    if !url.starts_with(SPOTIFY_TRACK_PREFIX) {
        return Err(Rejection::InvalidSourceUrlFormat);
    }
    if url.chars().count() > MAX_URL_LEN {
        return Err(Rejection::FieldTooLong {
            field: "spotify_url",
            max: MAX_URL_LEN,
        });
    }
    Ok(url.to_string())
}

/// Empty and null both mean "no cover"
fn check_cover_url(value: Option<&Option<String>>) -> Result<Option<String>, Rejection> {
    let url = match value.and_then(|v| v.as_deref()).map(str::trim) {
        None | Some("") => return Ok(None),
        Some(url) => url,
    };
    if url.chars().count() > MAX_URL_LEN {
        return Err(Rejection::FieldTooLong {
            field: "cover_art_url",
            max: MAX_URL_LEN,
        });
    }
    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(Rejection::InvalidCoverUrlFormat);
    }
    // Extension is judged on the path, so query strings and fragments are cut
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if !COVER_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Err(Rejection::InvalidCoverUrlFormat);
    }
    Ok(Some(url.to_string()))
}

/// Omitted genre defaults to Pop
fn check_genre(value: Option<&str>) -> Result<Genre, Rejection> {
    match value {
        None => Ok(Genre::default()),
        Some(value) => value.parse().map_err(|_| Rejection::InvalidGenre {
            value: value.to_string(),
        }),
    }
}

/// Integers, integral floats and numeric strings; nothing else
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
