//! Error types for stereogrid-catalog
//!
//! Every failure leaves the service as an error [`Envelope`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use stereogrid_common::api::{AccessDenied, Envelope};
use stereogrid_common::Rejection;
use thiserror::Error;
use tracing::{error, warn};

use crate::api::envelope_response;
use crate::spotify::SpotifyError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Song write refused by validation or uniqueness (400)
    #[error("{0}")]
    Rejected(Rejection),

    /// Malformed body, query string or missing parameter (400)
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// No usable credentials (401)
    #[error("{0}")]
    Unauthorized(AccessDenied),

    /// Credentials valid but role insufficient (403)
    #[error("{0}")]
    Forbidden(AccessDenied),

    /// Route exists but not for this method (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Spotify could not be reached or refused the call (500)
    #[error("{0}")]
    UpstreamUnavailable(#[from] SpotifyError),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UpstreamUnavailable(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Forbidden => ApiError::Forbidden(denied),
            AccessDenied::Unauthenticated | AccessDenied::InvalidToken => {
                ApiError::Unauthorized(denied)
            }
        }
    }
}

impl From<stereogrid_common::Error> for ApiError {
    fn from(err: stereogrid_common::Error) -> Self {
        use stereogrid_common::Error;
        match err {
            Error::Rejected(rejection) => ApiError::Rejected(rejection),
            Error::NotFound(what) => ApiError::NotFound(what),
            Error::Database(e) => ApiError::Database(e),
            other @ (Error::Io(_) | Error::Config(_)) => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Rejected(rejection) => {
                warn!(kind = rejection.kind(), "Song write rejected: {}", rejection)
            }
            ApiError::Database(e) => error!("Database failure: {}", e),
            ApiError::Internal(msg) => error!("Internal error: {}", msg),
            ApiError::UpstreamUnavailable(e) => warn!("Spotify call failed: {}", e),
            _ => {}
        }

        let challenge = matches!(self, ApiError::Unauthorized(_));
        let mut response = envelope_response(Envelope::error(status.as_u16(), self.to_string()));
        if challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
