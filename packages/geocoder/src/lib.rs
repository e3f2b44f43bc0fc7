#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Forward geocoding for campus-safe incidents.
//!
//! Incidents arrive from the feeds with free-text locations and no
//! coordinates. This crate resolves them against a Nominatim-shaped
//! provider, with the constraints a public geocoder imposes:
//!
//! - a mandatory pause between calls (the public instance rate-limits and
//!   may ban bursty callers), so enrichment is strictly serial;
//! - verbose institutional address strings resolve poorly, so fallback
//!   queries are generated from sanitized variants;
//! - a per-run query cache so shared location strings are only sent once.
//!
//! The provider seam is the [`Geocoder`] trait; tests substitute a mock.

pub mod address;
pub mod enrich;
pub mod nominatim;

use async_trait::async_trait;
use thiserror::Error;

/// A resolved coordinate pair (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Forward geocoding capability: a query string to an optional coordinate.
///
/// A query that the provider cannot match resolves to `Ok(None)` — "no
/// match" is an expected outcome, not an error.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-form query to a coordinate, if the provider can.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request or response parsing fails.
    async fn forward(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}
