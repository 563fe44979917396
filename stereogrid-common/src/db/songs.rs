//! Song table queries

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::model::{Song, UnknownVariant};
use crate::validation::{Rejection, UniquenessProbe, ValidatedSong};
use crate::{Error, Result};

const SONG_COLUMNS: &str = "id, title, artist, album, year, duration, spotify_url, \
     cover_art_url, genre, decade, created_at, updated_at";

/// List filters; every populated field narrows the result
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SongFilter {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the artist
    pub artist: Option<String>,
    /// Exact genre wire value
    pub genre: Option<String>,
    /// Exact decade tag
    pub decade: Option<String>,
    pub year: Option<i32>,
    /// Inclusive lower bound on year
    pub year_min: Option<i32>,
    /// Inclusive upper bound on year
    pub year_max: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
struct SongRow {
    id: i64,
    title: String,
    artist: String,
    album: String,
    year: i32,
    duration: i32,
    spotify_url: String,
    cover_art_url: Option<String>,
    genre: String,
    decade: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SongRow> for Song {
    type Error = Error;

    fn try_from(row: SongRow) -> Result<Self> {
        let decode = |e: UnknownVariant| Error::Database(sqlx::Error::Decode(Box::new(e)));
        Ok(Song {
            id: row.id,
            title: row.title,
            artist: row.artist,
            album: row.album,
            year: row.year,
            duration: row.duration,
            spotify_url: row.spotify_url,
            cover_art_url: row.cover_art_url,
            genre: row.genre.parse().map_err(decode)?,
            decade: row.decade.parse().map_err(decode)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Catalog store backed by the `songs` table
#[derive(Debug, Clone)]
pub struct SongStore {
    pool: SqlitePool,
}

impl SongStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Song>> {
        let row: Option<SongRow> =
            sqlx::query_as(&format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Song::try_from).transpose()
    }

    /// Number of songs matching `filter`
    pub async fn count(&self, filter: &SongFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM songs");
        push_filter(&mut builder, filter);

        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    /// One page of songs matching `filter`, newest first
    pub async fn list(&self, filter: &SongFilter, limit: i64, offset: i64) -> Result<Vec<Song>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM songs", SONG_COLUMNS));
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<SongRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(Song::try_from).collect()
    }

    /// Insert a validated song; `now` becomes both timestamps
    pub async fn insert(&self, song: &ValidatedSong, now: DateTime<Utc>) -> Result<Song> {
        let result = sqlx::query(
            r#"
            INSERT INTO songs (
                title, artist, album, year, duration, spotify_url,
                cover_art_url, genre, decade, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(song.year)
        .bind(song.duration)
        .bind(&song.spotify_url)
        .bind(&song.cover_art_url)
        .bind(song.genre.as_str())
        .bind(song.decade.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, song))?;

        let id = result.last_insert_rowid();
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))
    }

    /// Replace every writable column of song `id`; `created_at` is untouched
    pub async fn update(&self, id: i64, song: &ValidatedSong, now: DateTime<Utc>) -> Result<Song> {
        let result = sqlx::query(
            r#"
            UPDATE songs SET
                title = ?, artist = ?, album = ?, year = ?, duration = ?,
                spotify_url = ?, cover_art_url = ?, genre = ?, decade = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(song.year)
        .bind(song.duration)
        .bind(&song.spotify_url)
        .bind(&song.cover_art_url)
        .bind(song.genre.as_str())
        .bind(song.decade.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, song))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("song {}", id)));
        }

        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("song {}", id)))
    }

    /// Returns false when no song had this id
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UniquenessProbe for SongStore {
    async fn find_title_artist_conflict(
        &self,
        title: &str,
        artist: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM songs WHERE title = ? AND artist = ? AND (? IS NULL OR id != ?) LIMIT 1",
        )
        .bind(title)
        .bind(artist)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }
}

/// The unique index is the backstop for racing writers; its violation is
/// reported exactly like the application-level check
fn write_error(err: sqlx::Error, song: &ValidatedSong) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Rejection::DuplicateTitleArtist {
                title: song.title.clone(),
                artist: song.artist.clone(),
            }
            .into();
        }
    }
    Error::Database(err)
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &SongFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(title) = &filter.title {
        builder
            .push(" AND title LIKE ")
            .push_bind(contains_pattern(title))
            .push(" ESCAPE '\\'");
    }
    if let Some(artist) = &filter.artist {
        builder
            .push(" AND artist LIKE ")
            .push_bind(contains_pattern(artist))
            .push(" ESCAPE '\\'");
    }
    if let Some(genre) = &filter.genre {
        builder.push(" AND genre = ").push_bind(genre.clone());
    }
    if let Some(decade) = &filter.decade {
        builder.push(" AND decade = ").push_bind(decade.clone());
    }
    if let Some(year) = filter.year {
        builder.push(" AND year = ").push_bind(year);
    }
    if let Some(year_min) = filter.year_min {
        builder.push(" AND year >= ").push_bind(year_min);
    }
    if let Some(year_max) = filter.year_max {
        builder.push(" AND year <= ").push_bind(year_max);
    }
}

/// LIKE pattern matching `needle` anywhere, with wildcards in it escaped
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
