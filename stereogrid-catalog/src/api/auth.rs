//! Authorization middleware
//!
//! Reads (GET/HEAD/OPTIONS) need a reader token, anything else an admin
//! token. OPTIONS changes nothing, so it is treated as a read. The
//! search proxy only needs a reader token regardless of method. `/health`
//! is mounted outside both layers.

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use stereogrid_common::api::{Principal, Role};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Role a catalog request needs, decided by its method
pub fn required_role(method: &Method) -> Role {
    if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
        Role::Reader
    } else {
        Role::Admin
    }
}

/// Authorization for the song routes
pub async fn require_role_for_method(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let required = required_role(request.method());
    authorize(&state, &request, required)?;
    Ok(next.run(request).await)
}

/// Authorization for the search proxy routes
pub async fn require_reader(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(&state, &request, Role::Reader)?;
    Ok(next.run(request).await)
}

fn authorize(state: &AppState, request: &Request, required: Role) -> Result<(), ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.auth.authorize(header, required) {
        Ok(Principal::Bypassed) => {
            warn!(
                method = %request.method(),
                path = request.uri().path(),
                "Authorization disabled, admitting request without credentials"
            );
            Ok(())
        }
        Ok(Principal::Token(role)) => {
            debug!(role = role.as_str(), path = request.uri().path(), "Request authorized");
            Ok(())
        }
        Err(denied) => {
            warn!(
                method = %request.method(),
                path = request.uri().path(),
                required = required.as_str(),
                "Request denied: {}",
                denied
            );
            Err(denied.into())
        }
    }
}
