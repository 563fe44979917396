//! Common error types for Stereogrid

use thiserror::Error;

use crate::validation::Rejection;

/// Common result type for Stereogrid operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A song write was refused by the validation engine or the store's
    /// uniqueness constraint
    #[error("{0}")]
    Rejected(#[from] Rejection),
}

impl Error {
    /// The rejection carried by this error, if it is one
    pub fn as_rejection(&self) -> Option<&Rejection> {
        match self {
            Error::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
