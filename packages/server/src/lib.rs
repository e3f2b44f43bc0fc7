#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the campus-safe pipeline.
//!
//! Exposes the ingestion triggers, the geocoding backfill, incident
//! queries, user reports, and the hotspot cluster endpoints. The hotspot
//! index is refreshed after every mutating run, not per pan/zoom request.

pub mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use campus_safe_geocoder::Geocoder;
use campus_safe_geocoder::nominatim::{NominatimConfig, NominatimGeocoder};
use campus_safe_hotspot::{ClusterConfig, HotspotEngine};
use campus_safe_ingest::IngestOptions;
use campus_safe_source::clery::DEFAULT_CLERY_URL;
use campus_safe_source::crime_mapping::DEFAULT_CRIME_MAPPING_URL;
use campus_safe_store::memory::MemoryStore;
use campus_safe_store::{IncidentNotifier, IncidentQuery, IncidentStore, LogNotifier, StoreError};
use tokio::sync::RwLock;

/// Server configuration, read from the environment with hard defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared secret protecting the ingestion triggers. `None` leaves
    /// them open (local development).
    pub ingest_secret: Option<String>,
    /// Campus crime log endpoint.
    pub clery_url: String,
    /// Regional crime-mapping endpoint.
    pub crime_mapping_url: String,
    /// Default ingestion tuning; per-request params override it.
    pub ingest: IngestOptions,
}

impl ServerConfig {
    /// Reads the configuration from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            ingest_secret: std::env::var("INGEST_SECRET").ok().filter(|s| !s.is_empty()),
            clery_url: std::env::var("CLERY_URL")
                .unwrap_or_else(|_| DEFAULT_CLERY_URL.to_string()),
            crime_mapping_url: std::env::var("CRIME_MAPPING_URL")
                .unwrap_or_else(|_| DEFAULT_CRIME_MAPPING_URL.to_string()),
            ingest: IngestOptions::from_env(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Incident store (the persistent backend is wired in at startup).
    pub store: Arc<dyn IncidentStore>,
    /// Incident-created notification sink.
    pub notifier: Arc<dyn IncidentNotifier>,
    /// Forward geocoder for enrichment runs.
    pub geocoder: Arc<dyn Geocoder>,
    /// Hotspot engine over the latest incident snapshot.
    pub engine: RwLock<HotspotEngine>,
    /// Shared HTTP client for the upstream feeds.
    pub client: reqwest::Client,
    /// Server configuration.
    pub config: ServerConfig,
}

impl AppState {
    /// Reloads the full incident set and rebuilds the hotspot index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store read fails.
    pub async fn refresh_hotspots(&self) -> Result<(), StoreError> {
        let records = self.store.find(&IncidentQuery::default()).await?;
        self.engine.write().await.set_incidents(&records);
        Ok(())
    }
}

/// Starts the campus-safe API server.
///
/// This is a regular async function — the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();
    let client = reqwest::Client::new();
    let geocoder = NominatimGeocoder::new(client.clone(), NominatimConfig::from_env());

    let state = web::Data::new(AppState {
        store: Arc::new(MemoryStore::new()),
        notifier: Arc::new(LogNotifier),
        geocoder: Arc::new(geocoder),
        engine: RwLock::new(HotspotEngine::new(ClusterConfig::default())),
        client,
        config,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/ingest/clery", web::get().to(handlers::ingest_clery))
                    .route("/ingest/clery", web::post().to(handlers::ingest_clery))
                    .route(
                        "/ingest/crime-mapping",
                        web::get().to(handlers::ingest_crime_mapping),
                    )
                    .route(
                        "/ingest/crime-mapping",
                        web::post().to(handlers::ingest_crime_mapping),
                    )
                    .route("/geocode", web::post().to(handlers::geocode_backfill))
                    .route("/incidents", web::get().to(handlers::incidents))
                    .route("/incidents", web::post().to(handlers::create_incident))
                    .route("/clusters", web::get().to(handlers::clusters))
                    .route(
                        "/clusters/{id}/expansion",
                        web::get().to(handlers::cluster_expansion),
                    ),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
