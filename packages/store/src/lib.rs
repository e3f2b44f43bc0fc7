#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Persistence boundary for campus-safe incidents.
//!
//! The real storage engine is an external collaborator; the pipeline only
//! depends on the [`IncidentStore`] trait — a keyed upsert store where
//! `(source, source_incident_id)` is the identity and re-applying the same
//! normalized record is always safe. [`memory::MemoryStore`] is the
//! reference backend used by tests and local development.

pub mod memory;

use async_trait::async_trait;
use campus_safe_incident_models::{IncidentRecord, IncidentSource, NormalizedIncident};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend failed to execute the operation.
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// No record exists with the given id.
    #[error("no record with id {id}")]
    NotFound {
        /// The id that was looked up.
        id: Uuid,
    },
}

/// Filters for [`IncidentStore::find`]. All filters are conjunctive;
/// results are ordered by effective occurrence time, newest first.
#[derive(Debug, Clone, Default)]
pub struct IncidentQuery {
    /// Only records from this source.
    pub source: Option<IncidentSource>,
    /// `Some(true)`: only records with both coordinates. `Some(false)`:
    /// only records missing at least one. `None`: no coordinate filter.
    pub has_coordinates: Option<bool>,
    /// Only records occurring at or after this instant.
    pub occurred_from: Option<DateTime<Utc>>,
    /// Only records occurring at or before this instant.
    pub occurred_to: Option<DateTime<Utc>>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

/// Result of an upsert: the stored record and whether it was newly created.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// The record as stored.
    pub record: IncidentRecord,
    /// `true` when no record existed for the identity key.
    pub created: bool,
}

/// Keyed idempotent upsert store for incidents.
///
/// On conflict, every mutable normalized field is overwritten with the
/// newer value; the identity key, record id, and creation time never
/// change. Re-running an ingestion over an overlapping window therefore
/// produces no duplicates and loses no data present in the newer record.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Creates or updates the record keyed by
    /// `(incident.source, incident.source_incident_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend write fails.
    async fn upsert(&self, incident: NormalizedIncident) -> Result<UpsertOutcome, StoreError>;

    /// Returns records matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    async fn find(&self, query: &IncidentQuery) -> Result<Vec<IncidentRecord>, StoreError>;

    /// Sets the coordinates of an existing record by id. Used by the
    /// geocoding backfill, which must not touch any other field.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no record has the id, or
    /// [`StoreError`] if the backend write fails.
    async fn set_coordinates(
        &self,
        id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), StoreError>;
}

/// Sink for "incident created" events.
///
/// Fired once per newly created record, from any ingestion path. The
/// delivery transport (push channel, polling, etc.) is an external
/// collaborator; the default implementation just logs.
#[async_trait]
pub trait IncidentNotifier: Send + Sync {
    /// Called after a record has been durably created.
    async fn incident_created(&self, record: &IncidentRecord);
}

/// Notifier that records creations in the log and nothing else.
pub struct LogNotifier;

#[async_trait]
impl IncidentNotifier for LogNotifier {
    async fn incident_created(&self, record: &IncidentRecord) {
        log::info!(
            "incident created: {} {} ({})",
            record.incident.source,
            record.incident.source_incident_id,
            record.incident.description,
        );
    }
}
