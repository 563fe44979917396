//! Database access layer
//!
//! SQLite via sqlx. The `songs` table mirrors the (title, artist) uniqueness
//! rule as a unique index so concurrent writers cannot both win.

pub mod init;
pub mod songs;

pub use init::{init_database, init_memory_database};
pub use songs::{SongFilter, SongStore};
