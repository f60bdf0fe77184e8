#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event feed clients, write-back, and incident normalization.
//!
//! A remote feed implements [`feed::EventFeed`] and emits full node
//! snapshots onto a [`feed::Subscription`] channel. Each snapshot is run
//! through [`normalize::normalize_snapshot`] to produce the ordered
//! [`Incident`] collection. When no live data is available the
//! [`fallback`] demo set stands in.
//!
//! [`Incident`]: city_pulse_incident_models::Incident

pub mod age;
pub mod backend;
pub mod config;
pub mod fallback;
pub mod feed;
pub mod firebase;
pub mod memory;
pub mod normalize;
pub mod severity;
pub mod sse;
pub mod stream;
pub mod store;
pub mod type_mapping;

/// Errors opening or running a feed subscription.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the credentials or rules denied access.
    #[error("permission denied (HTTP {status})")]
    PermissionDenied {
        /// HTTP status code returned by the backend.
        status: u16,
    },

    /// The backend answered with an unexpected status code.
    #[error("unexpected HTTP status {status}")]
    Status {
        /// HTTP status code returned by the backend.
        status: u16,
    },

    /// The client was closed before subscribing.
    #[error("feed client is closed")]
    Closed,

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Errors from write-back operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success status code.
    #[error("unexpected HTTP status {status}")]
    Status {
        /// HTTP status code returned by the backend.
        status: u16,
    },

    /// The key does not name an existing record.
    #[error("no event with key {key:?}")]
    NotFound {
        /// The requested key.
        key: String,
    },

    /// The key contains characters the feed does not allow.
    #[error("invalid event key {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// The submitted draft cannot be turned into an event.
    #[error("invalid draft: {message}")]
    InvalidDraft {
        /// What is wrong with the draft.
        message: String,
    },

    /// The client was closed.
    #[error("event store is closed")]
    Closed,
}
