#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Feed adapters for external campus-crime data sources.
//!
//! Each adapter fetches one page of its feed's native protocol and
//! normalizes the rows into [`campus_safe_incident_models::NormalizedIncident`].
//! Row-level parsing is fail-soft: a malformed timestamp or missing
//! sub-field degrades to `None`/`"Unknown"` rather than aborting the batch.
//! Only a non-success HTTP status from the feed itself is a hard error.

pub mod clery;
pub mod crime_mapping;
pub mod parsing;

/// Errors that can occur during feed operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The feed returned a non-success HTTP status.
    #[error("feed request failed with status {status}")]
    Fetch {
        /// The HTTP status returned by the feed.
        status: reqwest::StatusCode,
    },

    /// Data normalization error.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}
