//! API authentication via bearer tokens
//!
//! Tokens are configured as SHA-256 digests, each granted a [`Role`]. A
//! request presents the plain token in `Authorization: Bearer <token>`; the
//! digest of what was presented is looked up in the table.
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions. No HTTP framework
//! dependencies (Axum, etc.) - those are in the catalog service.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Access level granted to a token
///
/// Ordered: an `Admin` token satisfies every `Reader` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Admin => "admin",
        }
    }
}

/// One configured token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Lowercase hex SHA-256 of the plain token
    pub sha256: String,
    pub role: Role,
}

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("You do not have permission to perform this action")]
    Forbidden,
}

/// Who a request was admitted as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Token(Role),
    /// Authorization is switched off; nobody was checked
    Bypassed,
}

/// Hex SHA-256 digest of a plain token
///
/// # Examples
///
/// ```
/// use stereogrid_common::api::auth::hash_token;
///
/// let digest = hash_token("secret");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, hash_token("secret"));
/// ```
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Extract the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively; anything other than
/// `Bearer <token>` yields `None`.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Token table plus the global on/off switch
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    disabled: bool,
    tokens: HashMap<String, Role>,
}

impl AuthPolicy {
    pub fn new(entries: &[TokenEntry]) -> Self {
        let tokens = entries
            .iter()
            .map(|e| (e.sha256.trim().to_ascii_lowercase(), e.role))
            .collect();
        Self {
            disabled: false,
            tokens,
        }
    }

    /// Policy that admits every request
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            tokens: HashMap::new(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Decide whether a request carrying `header` may proceed at `required`
    pub fn authorize(
        &self,
        header: Option<&str>,
        required: Role,
    ) -> Result<Principal, AccessDenied> {
        if self.disabled {
            return Ok(Principal::Bypassed);
        }

        let header = header.ok_or(AccessDenied::Unauthenticated)?;
        let token = parse_bearer(header).ok_or(AccessDenied::InvalidToken)?;
        let role = *self
            .tokens
            .get(&hash_token(token))
            .ok_or(AccessDenied::InvalidToken)?;

        if role >= required {
            Ok(Principal::Token(role))
        } else {
            Err(AccessDenied::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AuthPolicy {
        AuthPolicy::new(&[
            TokenEntry {
                sha256: hash_token("reader-token"),
                role: Role::Reader,
            },
            TokenEntry {
                sha256: hash_token("admin-token").to_ascii_uppercase(),
                role: Role::Admin,
            },
        ])
    }

    #[test]
    fn test_hash_token_known_value() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_bearer("Basic abc"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("abc"), None);
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        assert_eq!(
            policy().authorize(None, Role::Reader),
            Err(AccessDenied::Unauthenticated)
        );
        assert_eq!(
            policy().authorize(None, Role::Admin),
            Err(AccessDenied::Unauthenticated)
        );
    }

    #[test]
    fn test_unknown_token_is_invalid() {
        assert_eq!(
            policy().authorize(Some("Bearer nope"), Role::Reader),
            Err(AccessDenied::InvalidToken)
        );
    }

    #[test]
    fn test_reader_can_read_but_not_write() {
        let policy = policy();
        assert_eq!(
            policy.authorize(Some("Bearer reader-token"), Role::Reader),
            Ok(Principal::Token(Role::Reader))
        );
        assert_eq!(
            policy.authorize(Some("Bearer reader-token"), Role::Admin),
            Err(AccessDenied::Forbidden)
        );
    }

    #[test]
    fn test_admin_satisfies_both_levels() {
        let policy = policy();
        assert!(policy.authorize(Some("Bearer admin-token"), Role::Reader).is_ok());
        assert_eq!(
            policy.authorize(Some("Bearer admin-token"), Role::Admin),
            Ok(Principal::Token(Role::Admin))
        );
    }

    #[test]
    fn test_disabled_policy_bypasses() {
        let policy = AuthPolicy::disabled();
        assert!(policy.is_disabled());
        assert_eq!(policy.authorize(None, Role::Admin), Ok(Principal::Bypassed));
    }
}
