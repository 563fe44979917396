//! Shared API response types
//!
//! Every HTTP response body produced by the catalog service, success or
//! failure, is an [`Envelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome marker carried in every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Related resources for a single song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    /// Absolute URL of the song collection
    pub collection: String,
    /// The song's track page on the streaming service
    pub spotify: String,
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Total number of matching records
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Uniform response wrapper
///
/// # Examples
///
/// ```
/// use stereogrid_common::api::types::{Envelope, ResponseStatus};
///
/// let envelope = Envelope::error(404, "Song not found");
/// assert_eq!(envelope.status, ResponseStatus::Error);
/// assert_eq!(envelope.message.as_deref(), Some("Song not found"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub status: ResponseStatus,

    /// HTTP status code, repeated in the body
    pub code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,

    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Successful response carrying `data`
    pub fn success(code: u16, data: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            code,
            message: None,
            data: Some(data),
            links: None,
            pagination: None,
            timestamp: crate::time::now(),
        }
    }

    /// Successful response with only a message (e.g. after delete)
    pub fn acknowledged(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            code,
            message: Some(message.into()),
            data: None,
            links: None,
            pagination: None,
            timestamp: crate::time::now(),
        }
    }

    /// Failure response
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            code,
            message: Some(message.into()),
            data: None,
            links: None,
            pagination: None,
            timestamp: crate::time::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_pagination(mut self, pagination: PageInfo) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Replace the construction-time timestamp
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at;
        self
    }
}
