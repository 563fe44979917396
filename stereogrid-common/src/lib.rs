//! # Stereogrid Common Library
//!
//! Shared code for the Stereogrid song catalog:
//! - Song entity model and decade mapping
//! - Validation and uniqueness rules for song writes
//! - SQLite song store
//! - Configuration loading
//! - Response envelope and API token types
//! - Clock abstraction for time-dependent rules

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod time;
pub mod validation;

pub use error::{Error, Result};
pub use model::{decade_for_year, Decade, Genre, Song};
pub use validation::{Rejection, SongPayload, SongValidator, ValidatedSong};
