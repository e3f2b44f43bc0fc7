#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion coordinator for the campus-safe pipeline.
//!
//! Each run is authorize → fetch → normalize → (optional) geocode →
//! batched idempotent upsert. Runs are restartable: the upsert key is
//! `(source, source_incident_id)`, so re-running over an overlapping
//! window never duplicates records, and a partial failure reports how
//! many records were committed before the run stopped.

use std::time::Duration;

use campus_safe_geocoder::enrich::{EnrichOptions, apply_geocoding};
use campus_safe_geocoder::{Geocoder, address::build_fallback_queries};
use campus_safe_incident_models::{IncidentKind, IncidentRecord, IncidentSource, NormalizedIncident};
use campus_safe_source::SourceError;
use campus_safe_source::clery::{CleryPaging, fetch_clery, normalize_clery};
use campus_safe_source::crime_mapping::{fetch_crime_mapping, normalize_crime_mapping};
use campus_safe_store::{IncidentNotifier, IncidentQuery, IncidentStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// City suffix appended to every geocoding query so bare building and
/// street names resolve near campus instead of anywhere on the planet.
pub const CAMPUS_CITY_CONTEXT: &str = "East Lansing, MI";

/// Institution token for campus log queries. Building names like
/// "Wells Hall" only resolve when anchored to the university grounds.
pub const CAMPUS_INSTITUTION_CONTEXT: &str = "Michigan State University";

/// Hard cap on the crime-mapping date window, in days.
pub const MAX_WINDOW_DAYS: i64 = 30;

/// Hard cap on records examined per geocoding backfill run.
pub const MAX_BACKFILL_LIMIT: usize = 100;

/// Errors from an ingestion or backfill run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The caller did not present the configured shared secret.
    #[error("unauthorized")]
    Unauthorized,

    /// The upstream feed could not be fetched or decoded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A store read or coordinate write failed outside the batch loop.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A batch upsert failed partway through the run.
    #[error("upsert failed after committing {committed} records: {source}")]
    Upsert {
        /// Records durably committed before the run stopped, including
        /// successes inside the failing batch.
        committed: usize,
        /// The store failure that ended the run.
        source: StoreError,
    },
}

/// Shared-secret check for ingestion triggers.
///
/// No configured secret (or an empty one) leaves the endpoint open. When a
/// secret is set, either the header or the query value must match exactly.
///
/// # Errors
///
/// Returns [`IngestError::Unauthorized`] when a secret is configured and
/// neither candidate matches.
pub fn authorize(
    secret: Option<&str>,
    header: Option<&str>,
    query: Option<&str>,
) -> Result<(), IngestError> {
    match secret {
        None => Ok(()),
        Some(s) if s.is_empty() => Ok(()),
        Some(s) => {
            if header == Some(s) || query == Some(s) {
                Ok(())
            } else {
                Err(IngestError::Unauthorized)
            }
        }
    }
}

/// Tuning knobs for a feed ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Whether to geocode newly normalized incidents inline.
    pub geocode: bool,
    /// Maximum incidents to attempt geocoding for in this run.
    pub geocode_max: usize,
    /// Pause between geocoding attempts, in milliseconds.
    pub geocode_delay_ms: u64,
    /// Upsert batch size.
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            geocode: true,
            geocode_max: 25,
            geocode_delay_ms: 1100,
            batch_size: 25,
        }
    }
}

impl IngestOptions {
    /// Reads overrides from the environment, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            geocode: defaults.geocode,
            geocode_max: std::env::var("GEOCODING_MAX_PER_RUN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.geocode_max),
            geocode_delay_ms: std::env::var("GEOCODING_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.geocode_delay_ms),
            batch_size: std::env::var("INGEST_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.batch_size),
        }
    }

    fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            max: self.geocode_max,
            delay: Duration::from_millis(self.geocode_delay_ms),
        }
    }
}

/// Outcome of a feed ingestion run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Total rows the feed reports as available.
    pub total_available: u64,
    /// Records upserted by this run.
    pub ingested: usize,
    /// Records that received coordinates during this run.
    pub geocoded: usize,
}

/// Outcome of a geocoding backfill run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillSummary {
    /// Records examined (stored records missing coordinates).
    pub checked: usize,
    /// Records whose coordinates were resolved and persisted.
    pub geocoded: usize,
}

/// Geocoding queries for a normalized incident, most specific first.
///
/// Feeds that split the location into a named place and a street address
/// (the campus log) use both and anchor every query to the university;
/// feeds with a single location string (the regional service) fall back to
/// it when it carries information, with the city context alone.
#[must_use]
pub fn incident_fallback_queries(incident: &NormalizedIncident) -> Vec<String> {
    let address = match incident.address.as_deref() {
        Some(addr) => Some(addr),
        None if incident.location_name.is_none() && incident.location != "Unknown" => {
            Some(incident.location.as_str())
        }
        None => None,
    };
    let context = match incident.source {
        IncidentSource::Clery => {
            format!("{CAMPUS_INSTITUTION_CONTEXT}, {CAMPUS_CITY_CONTEXT}")
        }
        IncidentSource::CrimeMapping | IncidentSource::UserReport => {
            CAMPUS_CITY_CONTEXT.to_string()
        }
    };
    build_fallback_queries(incident.location_name.as_deref(), address, &context)
}

fn record_fallback_queries(record: &IncidentRecord) -> Vec<String> {
    incident_fallback_queries(&record.incident)
}

/// Upserts incidents in fixed-size batches, concurrently within a batch.
///
/// The notifier fires once for each newly created record. On the first
/// batch containing a failure the run stops; successes from that batch
/// still count toward the committed total, and nothing is rolled back.
///
/// # Errors
///
/// Returns [`IngestError::Upsert`] carrying the committed count when any
/// upsert in a batch fails.
pub async fn upsert_batches(
    store: &dyn IncidentStore,
    notifier: &dyn IncidentNotifier,
    incidents: Vec<NormalizedIncident>,
    batch_size: usize,
) -> Result<usize, IngestError> {
    let batch_size = batch_size.max(1);
    let mut committed = 0usize;

    for chunk in incidents.chunks(batch_size) {
        let results =
            futures::future::join_all(chunk.iter().cloned().map(|inc| store.upsert(inc))).await;

        let mut failure: Option<StoreError> = None;
        for result in results {
            match result {
                Ok(outcome) => {
                    committed += 1;
                    if outcome.created {
                        notifier.incident_created(&outcome.record).await;
                    }
                }
                Err(e) => failure = Some(e),
            }
        }

        if let Some(source) = failure {
            log::error!("ingest: batch failed after {committed} committed: {source}");
            return Err(IngestError::Upsert { committed, source });
        }
    }

    Ok(committed)
}

async fn enrich_incidents(
    geocoder: Option<&dyn Geocoder>,
    incidents: &mut [NormalizedIncident],
    options: &IngestOptions,
) -> usize {
    match geocoder {
        Some(geocoder) if options.geocode => {
            apply_geocoding(
                geocoder,
                incidents,
                |_| None,
                incident_fallback_queries,
                &options.enrich_options(),
            )
            .await
        }
        _ => 0,
    }
}

/// Runs one campus crime log ingestion: fetch a page, normalize it,
/// optionally geocode, and upsert in batches.
///
/// # Errors
///
/// Returns [`IngestError::Source`] when the feed fetch fails, or
/// [`IngestError::Upsert`] when a batch write fails.
pub async fn run_clery_ingest(
    client: &reqwest::Client,
    base_url: &str,
    paging: &CleryPaging,
    geocoder: Option<&dyn Geocoder>,
    store: &dyn IncidentStore,
    notifier: &dyn IncidentNotifier,
    options: &IngestOptions,
) -> Result<IngestSummary, IngestError> {
    let response = fetch_clery(client, base_url, paging).await?;
    let total_available = response.total_available();
    let mut incidents = normalize_clery(&response.data);
    log::info!(
        "clery: normalized {} of {total_available} available rows",
        incidents.len()
    );

    let geocoded = enrich_incidents(geocoder, &mut incidents, options).await;
    let ingested = upsert_batches(store, notifier, incidents, options.batch_size).await?;

    Ok(IngestSummary {
        total_available,
        ingested,
        geocoded,
    })
}

/// Runs one regional crime-mapping ingestion over a trailing date window.
///
/// `days` is clamped to `1..=30`.
///
/// # Errors
///
/// Returns [`IngestError::Source`] when the feed fetch fails, or
/// [`IngestError::Upsert`] when a batch write fails.
pub async fn run_crime_mapping_ingest(
    client: &reqwest::Client,
    base_url: &str,
    days: i64,
    geocoder: Option<&dyn Geocoder>,
    store: &dyn IncidentStore,
    notifier: &dyn IncidentNotifier,
    options: &IngestOptions,
) -> Result<IngestSummary, IngestError> {
    let days = days.clamp(1, MAX_WINDOW_DAYS);
    let end = Utc::now();
    let start = end - chrono::Duration::days(days);

    let response = fetch_crime_mapping(client, base_url, start, end).await?;
    let total_available = response.total;
    let mut incidents = normalize_crime_mapping(&response.data);
    log::info!(
        "crime-mapping: normalized {} of {total_available} available rows ({days} day window)",
        incidents.len()
    );

    let geocoded = enrich_incidents(geocoder, &mut incidents, options).await;
    let ingested = upsert_batches(store, notifier, incidents, options.batch_size).await?;

    Ok(IngestSummary {
        total_available,
        ingested,
        geocoded,
    })
}

/// Parameters for a geocoding backfill run.
#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Restrict the run to one feed.
    pub source: Option<IncidentSource>,
    /// Maximum records to examine, clamped to [`MAX_BACKFILL_LIMIT`].
    pub limit: usize,
    /// Pause between geocoding attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            source: None,
            limit: 25,
            delay_ms: 1100,
        }
    }
}

/// Geocodes stored records that are still missing coordinates, newest
/// first, and persists each resolution.
///
/// # Errors
///
/// Returns [`IngestError::Store`] when the store read or a coordinate
/// write fails.
pub async fn run_geocode_backfill(
    geocoder: &dyn Geocoder,
    store: &dyn IncidentStore,
    options: &BackfillOptions,
) -> Result<BackfillSummary, IngestError> {
    let limit = options.limit.clamp(1, MAX_BACKFILL_LIMIT);
    let query = IncidentQuery {
        source: options.source,
        has_coordinates: Some(false),
        limit: Some(limit),
        ..IncidentQuery::default()
    };

    let mut records = store.find(&query).await?;
    let checked = records.len();

    let enrich_options = EnrichOptions {
        max: limit,
        delay: Duration::from_millis(options.delay_ms),
    };
    let geocoded = apply_geocoding(
        geocoder,
        &mut records,
        |_| None,
        record_fallback_queries,
        &enrich_options,
    )
    .await;

    for record in &records {
        if let (Some(lat), Some(lng)) = (record.incident.latitude, record.incident.longitude) {
            store.set_coordinates(record.id, lat, lng).await?;
        }
    }

    log::info!("backfill: {checked} checked, {geocoded} geocoded");
    Ok(BackfillSummary { checked, geocoded })
}

/// A user-submitted incident report.
///
/// The whole submission, reporter-chosen kind and attached image included,
/// is preserved as the stored record's `raw` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    /// Short title for the report. Defaults to `"User Report"`.
    #[serde(default)]
    pub name: Option<String>,
    /// Kind chosen by the reporter, if any.
    #[serde(default, rename = "type")]
    pub kind: Option<IncidentKind>,
    /// What happened, in the reporter's words. Defaults to
    /// `"No details provided"`.
    #[serde(default)]
    pub description: Option<String>,
    /// Where it happened, for display. Defaults to `"Unknown"`.
    #[serde(default)]
    pub location: Option<String>,
    /// Latitude picked on the map, if any.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude picked on the map, if any.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// When it happened. Defaults to the submission time.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Attached image as a data URL, if any. Kept only in `raw`.
    #[serde(default)]
    pub image: Option<String>,
}

/// Stores a user-submitted report as a first-class incident and fires the
/// created notification.
///
/// # Errors
///
/// Returns [`IngestError::Store`] when the upsert fails.
pub async fn create_user_report(
    store: &dyn IncidentStore,
    notifier: &dyn IncidentNotifier,
    report: UserReport,
) -> Result<IncidentRecord, IngestError> {
    let now = Utc::now();
    // The submission itself is the audit payload.
    let raw = serde_json::to_value(&report).unwrap_or(serde_json::Value::Null);

    let incident = NormalizedIncident {
        source: IncidentSource::UserReport,
        source_incident_id: format!("user-{}", Uuid::new_v4()),
        incident_num: None,
        case_number: None,
        offense_code: Some(report.name.unwrap_or_else(|| "User Report".to_string())),
        type_icon_url: None,
        description: report
            .description
            .unwrap_or_else(|| "No details provided".to_string()),
        location: report.location.unwrap_or_else(|| "Unknown".to_string()),
        location_name: None,
        address: None,
        cross_street: None,
        latitude: report.latitude,
        longitude: report.longitude,
        agency: "User Report".to_string(),
        occurred_at: Some(report.occurred_at.unwrap_or(now)),
        reported_at: Some(now),
        disposition: None,
        raw,
    };

    let outcome = store.upsert(incident).await.map_err(IngestError::Store)?;
    if outcome.created {
        notifier.incident_created(&outcome.record).await;
    }
    Ok(outcome.record)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use campus_safe_geocoder::{GeoPoint, GeocodeError};
    use campus_safe_source::clery::normalize_clery;
    use campus_safe_store::memory::MemoryStore;
    use campus_safe_store::{IncidentQuery, UpsertOutcome};
    use serde_json::json;

    use super::*;

    struct CountingNotifier {
        created: AtomicUsize,
    }

    impl CountingNotifier {
        fn new() -> Self {
            Self {
                created: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.created.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IncidentNotifier for CountingNotifier {
        async fn incident_created(&self, _record: &IncidentRecord) {
            self.created.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Store wrapper that fails upserts for a poisoned dedup key.
    struct FailingStore {
        inner: MemoryStore,
        poison: String,
    }

    #[async_trait]
    impl IncidentStore for FailingStore {
        async fn upsert(
            &self,
            incident: NormalizedIncident,
        ) -> Result<UpsertOutcome, StoreError> {
            if incident.source_incident_id == self.poison {
                return Err(StoreError::Backend {
                    message: "write refused".to_string(),
                });
            }
            self.inner.upsert(incident).await
        }

        async fn find(&self, query: &IncidentQuery) -> Result<Vec<IncidentRecord>, StoreError> {
            self.inner.find(query).await
        }

        async fn set_coordinates(
            &self,
            id: Uuid,
            latitude: f64,
            longitude: f64,
        ) -> Result<(), StoreError> {
            self.inner.set_coordinates(id, latitude, longitude).await
        }
    }

    fn incident(id: &str) -> NormalizedIncident {
        NormalizedIncident {
            source: IncidentSource::Clery,
            source_incident_id: id.to_string(),
            incident_num: None,
            case_number: None,
            offense_code: None,
            type_icon_url: None,
            description: "THEFT".to_string(),
            location: "Unknown".to_string(),
            location_name: None,
            address: None,
            cross_street: None,
            latitude: None,
            longitude: None,
            agency: "Campus Police".to_string(),
            occurred_at: Some(Utc::now()),
            reported_at: None,
            disposition: None,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn authorize_is_open_without_a_secret() {
        assert!(authorize(None, None, None).is_ok());
        assert!(authorize(Some(""), None, None).is_ok());
        assert!(authorize(None, Some("anything"), None).is_ok());
    }

    #[test]
    fn authorize_accepts_header_or_query() {
        assert!(authorize(Some("s3cret"), Some("s3cret"), None).is_ok());
        assert!(authorize(Some("s3cret"), None, Some("s3cret")).is_ok());
        assert!(authorize(Some("s3cret"), Some("wrong"), Some("s3cret")).is_ok());
    }

    #[test]
    fn authorize_rejects_missing_or_wrong_secret() {
        assert!(matches!(
            authorize(Some("s3cret"), None, None),
            Err(IngestError::Unauthorized)
        ));
        assert!(matches!(
            authorize(Some("s3cret"), Some("wrong"), Some("also-wrong")),
            Err(IngestError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn upsert_batches_is_idempotent() {
        let store = MemoryStore::new();
        let notifier = CountingNotifier::new();
        let incidents: Vec<_> = (0..5).map(|i| incident(&format!("k-{i}"))).collect();

        let first = upsert_batches(&store, &notifier, incidents.clone(), 2)
            .await
            .unwrap();
        let second = upsert_batches(&store, &notifier, incidents, 2).await.unwrap();

        assert_eq!(first, 5);
        assert_eq!(second, 5);
        assert_eq!(store.len().await, 5);
        // Only the first pass creates records.
        assert_eq!(notifier.count(), 5);
    }

    #[tokio::test]
    async fn failed_batch_reports_committed_count() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            poison: "k-3".to_string(),
        };
        let notifier = CountingNotifier::new();
        // Batches of 2: [k-0, k-1], [k-2, k-3 fails], [k-4 never runs].
        let incidents: Vec<_> = (0..5).map(|i| incident(&format!("k-{i}"))).collect();

        let err = upsert_batches(&store, &notifier, incidents, 2)
            .await
            .unwrap_err();

        match err {
            IngestError::Upsert { committed, .. } => assert_eq!(committed, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.inner.len().await, 3);
    }

    #[tokio::test]
    async fn normalized_page_ingests_idempotently_end_to_end() {
        let rows = vec![
            json!(["LARCENY", "23H", "Main Library", "366 W Circle Dr", null,
                   "2024-01-15 14:30:00", null, "2024-000123", "Open"]),
            json!(["ASSAULT", null, "Wells Hall", null, null,
                   "2024-01-16 09:00:00", null, "2024-000124", null]),
            // No case number: keyed by the deterministic composite.
            json!(["TRESPASS", null, "North Hall", null, null,
                   "2024-01-17 22:15:00", null, null, null]),
        ];
        let store = MemoryStore::new();
        let notifier = CountingNotifier::new();

        let first = upsert_batches(&store, &notifier, normalize_clery(&rows), 25)
            .await
            .unwrap();
        let second = upsert_batches(&store, &notifier, normalize_clery(&rows), 25)
            .await
            .unwrap();

        assert_eq!(first, 3);
        assert_eq!(second, 3);
        assert_eq!(store.len().await, 3);
    }

    struct StaticGeocoder {
        point: GeoPoint,
    }

    #[async_trait]
    impl Geocoder for StaticGeocoder {
        async fn forward(&self, _query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
            Ok(Some(self.point))
        }
    }

    #[tokio::test]
    async fn backfill_persists_resolved_coordinates() {
        let store = MemoryStore::new();
        let notifier = CountingNotifier::new();
        let mut pending = incident("pending");
        pending.address = Some("123 Elm St".to_string());
        upsert_batches(&store, &notifier, vec![pending], 25)
            .await
            .unwrap();

        let geocoder = StaticGeocoder {
            point: GeoPoint {
                latitude: 42.73,
                longitude: -84.48,
            },
        };
        let summary = run_geocode_backfill(
            &geocoder,
            &store,
            &BackfillOptions {
                delay_ms: 0,
                ..BackfillOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.checked, 1);
        assert_eq!(summary.geocoded, 1);

        let stored = store.find(&IncidentQuery::default()).await.unwrap();
        assert_eq!(stored[0].incident.latitude, Some(42.73));

        // A second run finds nothing left to do.
        let again = run_geocode_backfill(
            &geocoder,
            &store,
            &BackfillOptions {
                delay_ms: 0,
                ..BackfillOptions::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(again.checked, 0);
    }

    #[tokio::test]
    async fn user_report_is_stored_and_notified() {
        let store = MemoryStore::new();
        let notifier = CountingNotifier::new();

        let record = create_user_report(
            &store,
            &notifier,
            UserReport {
                name: None,
                kind: None,
                description: Some("Suspicious person near bike racks".to_string()),
                location: Some("Wells Hall".to_string()),
                latitude: Some(42.723),
                longitude: Some(-84.482),
                occurred_at: None,
                image: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(record.incident.source, IncidentSource::UserReport);
        assert!(record.incident.source_incident_id.starts_with("user-"));
        assert_eq!(record.incident.offense_code.as_deref(), Some("User Report"));
        assert!(record.incident.occurred_at.is_some());
        assert_eq!(notifier.count(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn user_report_keeps_kind_and_image_in_raw() {
        let store = MemoryStore::new();
        let notifier = CountingNotifier::new();

        let report: UserReport = serde_json::from_value(json!({
            "name": "Mugging",
            "type": "robbery",
            "description": "Wallet taken at knifepoint",
            "latitude": 42.723,
            "longitude": -84.482,
            "image": "data:image/png;base64,AAAA",
        }))
        .unwrap();
        assert_eq!(report.kind, Some(IncidentKind::Robbery));

        let record = create_user_report(&store, &notifier, report).await.unwrap();

        assert_eq!(record.incident.offense_code.as_deref(), Some("Mugging"));
        assert_eq!(record.incident.raw["type"], "robbery");
        assert_eq!(record.incident.raw["image"], "data:image/png;base64,AAAA");
        assert_eq!(record.incident.raw["name"], "Mugging");
    }

    #[tokio::test]
    async fn empty_user_report_gets_defaults() {
        let store = MemoryStore::new();
        let notifier = CountingNotifier::new();

        let report: UserReport = serde_json::from_value(json!({})).unwrap();
        let record = create_user_report(&store, &notifier, report).await.unwrap();

        assert_eq!(record.incident.description, "No details provided");
        assert_eq!(record.incident.location, "Unknown");
        assert_eq!(record.incident.offense_code.as_deref(), Some("User Report"));
    }

    #[test]
    fn campus_log_queries_are_anchored_to_the_university() {
        let mut inc = incident("q");
        inc.location_name = Some("Wells Hall".to_string());
        inc.address = Some("619 Red Cedar Rd".to_string());
        let queries = incident_fallback_queries(&inc);
        assert_eq!(
            queries[0],
            "Wells Hall, 619 Red Cedar Rd, Michigan State University, East Lansing, MI"
        );
        assert!(queries.iter().all(|q| q.contains(CAMPUS_INSTITUTION_CONTEXT)));
    }

    #[test]
    fn fallback_queries_use_single_location_string() {
        let mut inc = incident("q");
        inc.source = IncidentSource::CrimeMapping;
        inc.location = "300 BLOCK W GRAND RIVER AVE".to_string();
        let queries = incident_fallback_queries(&inc);
        assert_eq!(
            queries,
            vec![
                "300 BLOCK W GRAND RIVER AVE, East Lansing, MI",
                "300 W GRAND RIVER AVE, East Lansing, MI",
            ]
        );
    }

    #[test]
    fn unknown_location_yields_no_queries() {
        let inc = incident("q");
        assert!(incident_fallback_queries(&inc).is_empty());
    }
}
