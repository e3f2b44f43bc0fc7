//! HTTP handler functions for the campus-safe API.

use actix_web::{HttpRequest, HttpResponse, web};
use campus_safe_hotspot::BoundingBox;
use campus_safe_incident_models::IncidentSource;
use campus_safe_ingest::{
    BackfillOptions, IngestError, IngestOptions, UserReport, authorize, create_user_report,
    run_clery_ingest, run_crime_mapping_ingest, run_geocode_backfill,
};
use campus_safe_source::clery::CleryPaging;
use campus_safe_store::IncidentQuery;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Header carrying the shared ingestion secret.
pub const SECRET_HEADER: &str = "x-ingest-secret";

/// Largest page the Clery trigger will request.
const MAX_CLERY_LENGTH: u64 = 1000;

/// Default and maximum limits for the incident listing.
const DEFAULT_INCIDENT_LIMIT: usize = 100;
const MAX_INCIDENT_LIMIT: usize = 500;

/// Default zoom when the clusters query omits one.
const DEFAULT_CLUSTER_ZOOM: u8 = 12;

#[derive(Serialize)]
struct ApiHealth {
    healthy: bool,
    version: String,
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn header_secret(req: &HttpRequest) -> Option<&str> {
    req.headers().get(SECRET_HEADER).and_then(|v| v.to_str().ok())
}

/// Maps a run failure to the wire shape: 401 for a bad secret, 500 with a
/// generic body otherwise. Upsert failures additionally carry how many
/// records were committed before the run stopped. Diagnostics go to the
/// log, never to the client.
fn ingest_error_response(context: &str, error: &IngestError) -> HttpResponse {
    match error {
        IngestError::Unauthorized => HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Unauthorized"
        })),
        IngestError::Upsert { committed, source } => {
            log::error!("{context}: upsert failed after {committed} committed: {source}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("{context} failed"),
                "committed": committed,
            }))
        }
        other => {
            log::error!("{context}: {other}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("{context} failed")
            }))
        }
    }
}

async fn refresh_after_mutation(state: &AppState) {
    if let Err(e) = state.refresh_hotspots().await {
        log::error!("Failed to refresh hotspot index: {e}");
    }
}

/// Query params for the Clery ingestion trigger.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleryIngestParams {
    /// Row offset.
    pub start: Option<u64>,
    /// Page size, capped at 1000.
    pub length: Option<u64>,
    /// Whether to geocode inline.
    pub geocode: Option<bool>,
    /// Geocoding budget override.
    pub geocode_max: Option<usize>,
    /// Geocoding delay override, milliseconds.
    pub geocode_delay: Option<u64>,
    /// Shared secret (alternative to the header).
    pub secret: Option<String>,
}

impl CleryIngestParams {
    fn options(&self, defaults: &IngestOptions) -> IngestOptions {
        IngestOptions {
            geocode: self.geocode.unwrap_or(defaults.geocode),
            geocode_max: self.geocode_max.unwrap_or(defaults.geocode_max),
            geocode_delay_ms: self.geocode_delay.unwrap_or(defaults.geocode_delay_ms),
            batch_size: defaults.batch_size,
        }
    }
}

/// `GET|POST /api/ingest/clery`
pub async fn ingest_clery(
    state: web::Data<AppState>,
    params: web::Query<CleryIngestParams>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(e) = authorize(
        state.config.ingest_secret.as_deref(),
        header_secret(&req),
        params.secret.as_deref(),
    ) {
        return ingest_error_response("Clery ingestion", &e);
    }

    let paging = CleryPaging {
        start: params.start.unwrap_or(0),
        length: params.length.unwrap_or(100).min(MAX_CLERY_LENGTH),
        ..CleryPaging::default()
    };
    let options = params.options(&state.config.ingest);

    match run_clery_ingest(
        &state.client,
        &state.config.clery_url,
        &paging,
        Some(state.geocoder.as_ref()),
        state.store.as_ref(),
        state.notifier.as_ref(),
        &options,
    )
    .await
    {
        Ok(summary) => {
            refresh_after_mutation(&state).await;
            HttpResponse::Ok().json(summary)
        }
        Err(e) => ingest_error_response("Clery ingestion", &e),
    }
}

/// Query params for the crime-mapping ingestion trigger.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeMappingIngestParams {
    /// Trailing window size in days, clamped to `1..=30`.
    pub days: Option<i64>,
    /// Whether to geocode inline.
    pub geocode: Option<bool>,
    /// Shared secret (alternative to the header).
    pub secret: Option<String>,
}

/// `GET|POST /api/ingest/crime-mapping`
pub async fn ingest_crime_mapping(
    state: web::Data<AppState>,
    params: web::Query<CrimeMappingIngestParams>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(e) = authorize(
        state.config.ingest_secret.as_deref(),
        header_secret(&req),
        params.secret.as_deref(),
    ) {
        return ingest_error_response("Crime-mapping ingestion", &e);
    }

    let mut options = state.config.ingest.clone();
    if let Some(geocode) = params.geocode {
        options.geocode = geocode;
    }

    match run_crime_mapping_ingest(
        &state.client,
        &state.config.crime_mapping_url,
        params.days.unwrap_or(7),
        Some(state.geocoder.as_ref()),
        state.store.as_ref(),
        state.notifier.as_ref(),
        &options,
    )
    .await
    {
        Ok(summary) => {
            refresh_after_mutation(&state).await;
            HttpResponse::Ok().json(summary)
        }
        Err(e) => ingest_error_response("Crime-mapping ingestion", &e),
    }
}

/// Query params for the geocoding backfill.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeParams {
    /// Maximum records to examine, capped at 100.
    pub limit: Option<usize>,
    /// Restrict to one feed (`clery`, `crime-mapping`, `user-report`).
    pub source: Option<String>,
    /// Pacing delay override, milliseconds.
    pub geocode_delay: Option<u64>,
    /// Shared secret (alternative to the header).
    pub secret: Option<String>,
}

/// `POST /api/geocode`
pub async fn geocode_backfill(
    state: web::Data<AppState>,
    params: web::Query<GeocodeParams>,
    req: HttpRequest,
) -> HttpResponse {
    if let Err(e) = authorize(
        state.config.ingest_secret.as_deref(),
        header_secret(&req),
        params.secret.as_deref(),
    ) {
        return ingest_error_response("Geocoding backfill", &e);
    }

    let defaults = BackfillOptions::default();
    let options = BackfillOptions {
        source: params
            .source
            .as_deref()
            .and_then(|s| s.parse::<IncidentSource>().ok()),
        limit: params.limit.unwrap_or(defaults.limit),
        delay_ms: params.geocode_delay.unwrap_or(defaults.delay_ms),
    };

    match run_geocode_backfill(state.geocoder.as_ref(), state.store.as_ref(), &options).await {
        Ok(summary) => {
            refresh_after_mutation(&state).await;
            HttpResponse::Ok().json(summary)
        }
        Err(e) => ingest_error_response("Geocoding backfill", &e),
    }
}

/// Query params for the incident listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListParams {
    /// Restrict to one feed.
    pub source: Option<String>,
    /// Only incidents at or after this instant (RFC 3339).
    pub from: Option<DateTime<Utc>>,
    /// Only incidents at or before this instant (RFC 3339).
    pub to: Option<DateTime<Utc>>,
    /// Maximum records, capped at 500.
    pub limit: Option<usize>,
}

/// `GET /api/incidents`
///
/// Lists geocoded records only; rows still waiting on coordinates are
/// invisible until a backfill resolves them.
pub async fn incidents(
    state: web::Data<AppState>,
    params: web::Query<IncidentListParams>,
) -> HttpResponse {
    let query = IncidentQuery {
        source: params
            .source
            .as_deref()
            .and_then(|s| s.parse::<IncidentSource>().ok()),
        has_coordinates: Some(true),
        occurred_from: params.from,
        occurred_to: params.to,
        limit: Some(params.limit.unwrap_or(DEFAULT_INCIDENT_LIMIT).min(MAX_INCIDENT_LIMIT)),
    };

    match state.store.find(&query).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            log::error!("Failed to query incidents: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to query incidents"
            }))
        }
    }
}

/// `POST /api/incidents`
///
/// Accepts a user-submitted report and stores it as a first-class
/// incident.
pub async fn create_incident(
    state: web::Data<AppState>,
    report: web::Json<UserReport>,
) -> HttpResponse {
    match create_user_report(state.store.as_ref(), state.notifier.as_ref(), report.into_inner())
        .await
    {
        Ok(record) => {
            refresh_after_mutation(&state).await;
            HttpResponse::Created().json(record)
        }
        Err(e) => {
            log::error!("Failed to store user report: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to store report"
            }))
        }
    }
}

/// Query params for the clusters endpoint.
#[derive(Debug, Deserialize)]
pub struct ClusterParams {
    /// Viewport as `west,south,east,north`. Defaults to the whole map.
    pub bbox: Option<String>,
    /// Map zoom level.
    pub zoom: Option<u8>,
}

/// `GET /api/clusters?bbox=w,s,e,n&zoom=z`
pub async fn clusters(
    state: web::Data<AppState>,
    params: web::Query<ClusterParams>,
) -> HttpResponse {
    let bbox = params
        .bbox
        .as_deref()
        .and_then(BoundingBox::from_csv)
        .unwrap_or(BoundingBox::WORLD);
    let zoom = params.zoom.unwrap_or(DEFAULT_CLUSTER_ZOOM);

    let features = state.engine.read().await.features(&bbox, zoom);
    HttpResponse::Ok().json(features)
}

/// `GET /api/clusters/{id}/expansion`
pub async fn cluster_expansion(
    state: web::Data<AppState>,
    path: web::Path<usize>,
) -> HttpResponse {
    let cluster_id = path.into_inner();
    match state.engine.read().await.expansion_zoom(cluster_id) {
        Some(zoom) => HttpResponse::Ok().json(serde_json::json!({ "expansionZoom": zoom })),
        None => HttpResponse::NotFound().json(serde_json::json!({
            "error": "Unknown cluster"
        })),
    }
}
