#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial-temporal hotspot engine.
//!
//! Builds a zoom-aware cluster index over the geocoded incident set and
//! classifies each cluster as an ordinary group or a danger zone (a burst
//! of at least four incidents inside a 72-hour window, evaluated over the
//! cluster's entire accumulated history). Rendering radii come out of a
//! fixed policy: danger zones cover their furthest member plus a buffer,
//! ordinary clusters and lone incidents use severity-scaled constants.

pub mod cluster;

pub use cluster::{BoundingBox, ClusterConfig, ClusterIndex, ClusterPoint, ClusterView};

use campus_safe_incident_models::{IncidentKind, IncidentRecord};
use chrono::{DateTime, Duration, Utc};
use geo::{Distance, Haversine, Point};
use serde::Serialize;
use uuid::Uuid;

/// Minimum incidents inside the window for a danger zone.
pub const DANGER_MIN_INCIDENTS: usize = 4;

/// Danger-zone sliding-window width, in hours.
pub const DANGER_WINDOW_HOURS: i64 = 72;

/// Buffer beyond the furthest danger-zone member, in meters.
pub const DANGER_RADIUS_BUFFER_M: f64 = 50.0;

/// Minimum rendered danger-zone radius, in meters.
pub const DANGER_RADIUS_FLOOR_M: f64 = 150.0;

/// Rendered radius for ordinary clusters, in meters.
pub const CLUSTER_RADIUS_M: f64 = 60.0;

/// Rendered radius for a lone high-severity incident, in meters.
pub const POINT_RADIUS_HIGH_M: f64 = 300.0;

/// Rendered radius for a lone low-severity incident, in meters.
pub const POINT_RADIUS_LOW_M: f64 = 150.0;

/// Deepest zoom a cluster expansion will ever request.
pub const EXPANSION_ZOOM_CAP: u8 = 17;

/// Whether a timestamp multiset qualifies as a danger zone: any four
/// chronologically consecutive incidents within 72 hours of each other.
#[must_use]
pub fn is_danger_zone(timestamps: &[DateTime<Utc>]) -> bool {
    if timestamps.len() < DANGER_MIN_INCIDENTS {
        return false;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted
        .windows(DANGER_MIN_INCIDENTS)
        .any(|w| w[DANGER_MIN_INCIDENTS - 1] - w[0] <= Duration::hours(DANGER_WINDOW_HOURS))
}

/// One render-ready map feature.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HotspotFeature {
    /// A multi-incident cluster.
    #[serde(rename_all = "camelCase")]
    Cluster {
        /// Cluster id, valid against the current index snapshot.
        id: usize,
        /// Centroid latitude.
        latitude: f64,
        /// Centroid longitude.
        longitude: f64,
        /// Member count.
        count: usize,
        /// Maximum member severity.
        severity_score: u8,
        /// Whether the cluster passes the danger-zone test.
        danger: bool,
        /// Rendering radius, in meters.
        radius_m: f64,
    },
    /// A lone incident.
    #[serde(rename_all = "camelCase")]
    Incident {
        /// Stored incident record id.
        incident_id: Uuid,
        /// Incident latitude.
        latitude: f64,
        /// Incident longitude.
        longitude: f64,
        /// Classified kind.
        kind: IncidentKind,
        /// Severity weight of the kind.
        severity: u8,
        /// Rendering radius, in meters.
        radius_m: f64,
    },
}

/// Hotspot engine over the latest incident snapshot.
///
/// Pure and synchronous: [`Self::set_incidents`] does a full index
/// rebuild, and every query serves from that snapshot until the next
/// rebuild. Cluster ids are only meaningful against the snapshot that
/// produced them.
pub struct HotspotEngine {
    config: ClusterConfig,
    index: ClusterIndex,
}

impl HotspotEngine {
    /// Creates an engine with an empty index.
    #[must_use]
    pub fn new(config: ClusterConfig) -> Self {
        let index = ClusterIndex::new(config.clone(), Vec::new());
        Self { config, index }
    }

    /// Replaces the snapshot, dropping records without coordinates, and
    /// rebuilds the cluster index.
    pub fn set_incidents(&mut self, records: &[IncidentRecord]) {
        let points: Vec<ClusterPoint> = records
            .iter()
            .filter_map(|record| {
                let latitude = record.incident.latitude?;
                let longitude = record.incident.longitude?;
                Some(ClusterPoint {
                    incident_id: record.id,
                    longitude,
                    latitude,
                    kind: record.incident.kind(),
                    timestamp: record.effective_occurred_at(),
                })
            })
            .collect();
        log::debug!(
            "hotspot: rebuilding index with {} of {} records",
            points.len(),
            records.len()
        );
        self.index = ClusterIndex::new(self.config.clone(), points);
    }

    /// Number of points in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Render-ready features inside `bbox` at `zoom`.
    #[must_use]
    pub fn features(&self, bbox: &BoundingBox, zoom: u8) -> Vec<HotspotFeature> {
        self.index
            .clusters_in(bbox, zoom)
            .into_iter()
            .map(|view| self.feature(view))
            .collect()
    }

    /// The zoom to jump to when a cluster is clicked, capped at
    /// [`EXPANSION_ZOOM_CAP`]. `None` for unknown ids and lone points.
    #[must_use]
    pub fn expansion_zoom(&self, cluster_id: usize) -> Option<u8> {
        self.index
            .expansion_zoom(cluster_id)
            .map(|zoom| zoom.min(EXPANSION_ZOOM_CAP))
    }

    fn feature(&self, view: ClusterView) -> HotspotFeature {
        match view {
            ClusterView::Cluster {
                id,
                longitude,
                latitude,
                count,
                severity,
                timestamps,
            } => {
                let danger = is_danger_zone(&timestamps);
                let radius_m = if danger {
                    self.danger_radius_m(id, longitude, latitude)
                } else {
                    CLUSTER_RADIUS_M
                };
                HotspotFeature::Cluster {
                    id,
                    latitude,
                    longitude,
                    count,
                    severity_score: severity,
                    danger,
                    radius_m,
                }
            }
            ClusterView::Point(point) => {
                let severity = point.kind.severity();
                let radius_m = if severity >= 2 {
                    POINT_RADIUS_HIGH_M
                } else {
                    POINT_RADIUS_LOW_M
                };
                HotspotFeature::Incident {
                    incident_id: point.incident_id,
                    latitude: point.latitude,
                    longitude: point.longitude,
                    kind: point.kind,
                    severity,
                    radius_m,
                }
            }
        }
    }

    /// Danger-zone radius: distance from the centroid to the furthest
    /// member plus the buffer, floored.
    fn danger_radius_m(&self, id: usize, longitude: f64, latitude: f64) -> f64 {
        let centroid = Point::new(longitude, latitude);
        let furthest = self
            .index
            .leaves(id)
            .iter()
            .map(|leaf| Haversine.distance(centroid, Point::new(leaf.longitude, leaf.latitude)))
            .fold(0.0, f64::max);
        (furthest + DANGER_RADIUS_BUFFER_M).max(DANGER_RADIUS_FLOOR_M)
    }
}
