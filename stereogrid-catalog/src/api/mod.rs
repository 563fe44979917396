//! HTTP API handlers for stereogrid-catalog

pub mod auth;
pub mod extract;
pub mod health;
pub mod search;
pub mod songs;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use stereogrid_common::api::Envelope;

use crate::error::ApiError;
use crate::AppState;

pub use auth::{require_reader, require_role_for_method};
pub use health::health_routes;
pub use search::{search, token, validate_url};
pub use songs::{create_song, delete_song, get_song, list_songs, update_song};

/// Response carrying `envelope` with the HTTP status it names
///
/// The body is written by [`render_envelope`], which stamps the envelope
/// with the state's clock first.
pub fn envelope_response(envelope: Envelope) -> Response {
    let status = StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = status.into_response();
    response.extensions_mut().insert(envelope);
    response
}

/// Outermost middleware: serialize a pending envelope into the body
pub async fn render_envelope(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(envelope) = response.extensions_mut().remove::<Envelope>() else {
        return response;
    };

    let envelope = envelope.stamped(state.clock.now());
    let headers = std::mem::take(response.headers_mut());
    let mut rendered = (response.status(), Json(envelope)).into_response();
    rendered.headers_mut().extend(headers);
    rendered
}

/// Fallback for paths no route matches
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

/// Fallback for known paths hit with an unsupported method
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// `scheme://host` the client addressed, for building absolute links
pub(crate) fn request_origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .filter(|p| *p == "http" || *p == "https")
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_origin_defaults() {
        assert_eq!(request_origin(&HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn test_request_origin_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("music.example:8000"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(request_origin(&headers), "https://music.example:8000");
    }

    #[test]
    fn test_envelope_response_status() {
        let response = envelope_response(Envelope::error(404, "Song not found"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let envelope = response.extensions().get::<Envelope>().unwrap();
        assert_eq!(envelope.message.as_deref(), Some("Song not found"));
    }
}
