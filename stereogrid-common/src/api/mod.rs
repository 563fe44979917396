//! API module for shared HTTP API functionality
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types
//!
//! The catalog service wraps these with axum extractors and middleware.

pub mod auth;
pub mod types;

pub use auth::{hash_token, parse_bearer, AccessDenied, AuthPolicy, Principal, Role, TokenEntry};
pub use types::{Envelope, Links, PageInfo, ResponseStatus};
