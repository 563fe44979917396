//! Song entity model
//!
//! A [`Song`] is the only entity in the catalog. Its decade is never supplied
//! by callers; it is derived from the release year with [`decade_for_year`]
//! every time a song is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Earliest release year accepted by the catalog
pub const MIN_YEAR: i32 = 1970;

/// Decade bucket derived from a release year
///
/// Wire and database representation is the short tag (`"70s"`, `"00s"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decade {
    #[serde(rename = "70s")]
    Seventies,
    #[serde(rename = "80s")]
    Eighties,
    #[serde(rename = "90s")]
    Nineties,
    #[serde(rename = "00s")]
    TwoThousands,
    #[serde(rename = "10s")]
    Tens,
    #[serde(rename = "20s")]
    Twenties,
}

impl Decade {
    /// All buckets in chronological order
    pub const ALL: [Decade; 6] = [
        Decade::Seventies,
        Decade::Eighties,
        Decade::Nineties,
        Decade::TwoThousands,
        Decade::Tens,
        Decade::Twenties,
    ];

    /// Short tag used on the wire and in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Decade::Seventies => "70s",
            Decade::Eighties => "80s",
            Decade::Nineties => "90s",
            Decade::TwoThousands => "00s",
            Decade::Tens => "10s",
            Decade::Twenties => "20s",
        }
    }

    /// Literal year range covered by this bucket
    pub fn years(&self) -> RangeInclusive<i32> {
        match self {
            Decade::Seventies => 1970..=1979,
            Decade::Eighties => 1980..=1989,
            Decade::Nineties => 1990..=1999,
            Decade::TwoThousands => 2000..=2009,
            Decade::Tens => 2010..=2019,
            Decade::Twenties => 2020..=2029,
        }
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decade {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decade::ALL
            .into_iter()
            .find(|decade| decade.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("decade", s))
    }
}

/// Map a release year to its decade bucket
///
/// Total: years outside the bucket table (before 1970, or 2030 onward) fall
/// back to the most recent bucket instead of failing. Validation bounds the
/// year before this is reached, so the fallback only matters once the
/// current year passes the last bucket.
///
/// # Examples
///
/// ```
/// use stereogrid_common::model::{decade_for_year, Decade};
///
/// assert_eq!(decade_for_year(1985), Decade::Eighties);
/// assert_eq!(decade_for_year(2004), Decade::TwoThousands);
/// assert_eq!(decade_for_year(2031), Decade::Twenties);
/// ```
pub fn decade_for_year(year: i32) -> Decade {
    match year {
        1970..=1979 => Decade::Seventies,
        1980..=1989 => Decade::Eighties,
        1990..=1999 => Decade::Nineties,
        2000..=2009 => Decade::TwoThousands,
        2010..=2019 => Decade::Tens,
        2020..=2029 => Decade::Twenties,
        _ => Decade::Twenties,
    }
}

/// Fixed genre vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Rock,
    Pop,
    Disco,
    #[serde(rename = "New Wave")]
    NewWave,
    #[serde(rename = "Hip Hop")]
    HipHop,
    Electronic,
    Jazz,
    Classical,
    Country,
    #[serde(rename = "R&B")]
    RhythmAndBlues,
}

impl Genre {
    pub const ALL: [Genre; 10] = [
        Genre::Rock,
        Genre::Pop,
        Genre::Disco,
        Genre::NewWave,
        Genre::HipHop,
        Genre::Electronic,
        Genre::Jazz,
        Genre::Classical,
        Genre::Country,
        Genre::RhythmAndBlues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Rock => "Rock",
            Genre::Pop => "Pop",
            Genre::Disco => "Disco",
            Genre::NewWave => "New Wave",
            Genre::HipHop => "Hip Hop",
            Genre::Electronic => "Electronic",
            Genre::Jazz => "Jazz",
            Genre::Classical => "Classical",
            Genre::Country => "Country",
            Genre::RhythmAndBlues => "R&B",
        }
    }
}

impl Default for Genre {
    fn default() -> Self {
        Genre::Pop
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = UnknownVariant;

    /// Exact, case-sensitive match against the wire values
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|genre| genre.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("genre", s))
    }
}

/// A string did not name any variant of a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Stored song record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    /// Length in whole seconds
    pub duration: i32,
    pub spotify_url: String,
    pub cover_art_url: Option<String>,
    pub genre: Genre,
    pub decade: Decade,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
