//! Zoom-aware greedy point clustering over an R-tree.
//!
//! Points are projected onto the unit-square spherical-mercator plane and
//! clustered hierarchically: starting at the maximum clustering zoom and
//! walking down to zoom 0, each unprocessed point absorbs every neighbor
//! within the pixel radius for that zoom, producing a count-weighted
//! centroid. A cluster formed at zoom `z` renders as one blob at zooms
//! `<= z` and separates into its children at `z + 1`; above the maximum
//! zoom every point renders individually.

use std::collections::HashSet;
use std::f64::consts::PI;

use campus_safe_incident_models::IncidentKind;
use chrono::{DateTime, Utc};
use rstar::{AABB, RTree, primitives::GeomWithData};
use uuid::Uuid;

/// A clusterable incident observation. Rebuilt from the incident set on
/// every index build; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPoint {
    /// Stored incident record id.
    pub incident_id: Uuid,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Classified incident kind.
    pub kind: IncidentKind,
    /// Effective occurrence time.
    pub timestamp: DateTime<Utc>,
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    /// Western edge.
    pub west: f64,
    /// Southern edge.
    pub south: f64,
    /// Eastern edge.
    pub east: f64,
    /// Northern edge.
    pub north: f64,
}

impl BoundingBox {
    /// The whole map.
    pub const WORLD: Self = Self {
        west: -180.0,
        south: -85.0,
        east: 180.0,
        north: 85.0,
    };

    /// Parses the `west,south,east,north` query form.
    #[must_use]
    pub fn from_csv(value: &str) -> Option<Self> {
        let parts: Vec<f64> = value
            .split(',')
            .map(|p| p.trim().parse().ok())
            .collect::<Option<_>>()?;
        match parts.as_slice() {
            [west, south, east, north] => Some(Self {
                west: *west,
                south: *south,
                east: *east,
                north: *north,
            }),
            _ => None,
        }
    }
}

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Cluster radius in screen pixels.
    pub radius_px: f64,
    /// Tile size in pixels.
    pub tile_px: f64,
    /// Highest zoom at which clustering still happens.
    pub max_zoom: u8,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_px: 60.0,
            tile_px: 256.0,
            max_zoom: 15,
        }
    }
}

/// An arena node: either a leaf wrapping one point or a cluster of
/// lower-level nodes.
#[derive(Debug, Clone)]
struct Node {
    x: f64,
    y: f64,
    count: usize,
    severity: u8,
    timestamps: Vec<DateTime<Utc>>,
    children: Vec<usize>,
    /// Index into the point list for leaves, `None` for clusters.
    point: Option<usize>,
    /// Zoom at which this cluster was formed. Leaves carry
    /// `max_zoom + 1`.
    formed_zoom: u8,
}

/// One visible element at a zoom level.
#[derive(Debug, Clone)]
pub enum ClusterView {
    /// A multi-member cluster.
    Cluster {
        /// Stable id for leaf and expansion lookups against this index.
        id: usize,
        /// Count-weighted centroid longitude.
        longitude: f64,
        /// Count-weighted centroid latitude.
        latitude: f64,
        /// Number of member incidents.
        count: usize,
        /// Maximum member severity.
        severity: u8,
        /// Every member timestamp, verbatim (duplicates preserved).
        timestamps: Vec<DateTime<Utc>>,
    },
    /// An individual incident.
    Point(ClusterPoint),
}

type TreeEntry = GeomWithData<[f64; 2], usize>;

/// Immutable clustering index over one snapshot of incidents.
pub struct ClusterIndex {
    config: ClusterConfig,
    points: Vec<ClusterPoint>,
    nodes: Vec<Node>,
    /// One R-tree per zoom (`0..=max_zoom + 1`), holding exactly the
    /// nodes visible at that zoom.
    trees: Vec<RTree<TreeEntry>>,
}

impl ClusterIndex {
    /// Builds the full cluster hierarchy for a set of points.
    #[must_use]
    pub fn new(config: ClusterConfig, points: Vec<ClusterPoint>) -> Self {
        let mut nodes: Vec<Node> = points
            .iter()
            .enumerate()
            .map(|(i, p)| Node {
                x: project_x(p.longitude),
                y: project_y(p.latitude),
                count: 1,
                severity: p.kind.severity(),
                timestamps: vec![p.timestamp],
                children: Vec::new(),
                point: Some(i),
                formed_zoom: config.max_zoom + 1,
            })
            .collect();

        let level_count = usize::from(config.max_zoom) + 2;
        let mut levels: Vec<Vec<usize>> = vec![Vec::new(); level_count];
        let mut current: Vec<usize> = (0..nodes.len()).collect();
        levels[usize::from(config.max_zoom) + 1].clone_from(&current);

        for zoom in (0..=config.max_zoom).rev() {
            current = cluster_at_zoom(&mut nodes, &current, zoom, &config);
            levels[usize::from(zoom)].clone_from(&current);
        }

        let trees = levels
            .iter()
            .map(|ids| {
                RTree::bulk_load(
                    ids.iter()
                        .map(|&id| TreeEntry::new([nodes[id].x, nodes[id].y], id))
                        .collect(),
                )
            })
            .collect();

        Self {
            config,
            points,
            nodes,
            trees,
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the clusters and points visible inside `bbox` at `zoom`.
    #[must_use]
    pub fn clusters_in(&self, bbox: &BoundingBox, zoom: u8) -> Vec<ClusterView> {
        let level = usize::from(zoom.min(self.config.max_zoom + 1));
        // North has the smaller projected y.
        let envelope = AABB::from_corners(
            [project_x(bbox.west), project_y(bbox.north)],
            [project_x(bbox.east), project_y(bbox.south)],
        );
        self.trees[level]
            .locate_in_envelope(&envelope)
            .map(|entry| self.view(entry.data))
            .collect()
    }

    /// Returns every leaf point under a node, depth-first.
    #[must_use]
    pub fn leaves(&self, id: usize) -> Vec<&ClusterPoint> {
        let mut out = Vec::new();
        if self.nodes.get(id).is_some() {
            self.collect_leaves(id, &mut out);
        }
        out
    }

    /// The lowest zoom at which a cluster separates into its children.
    /// `None` for unknown ids and individual points.
    #[must_use]
    pub fn expansion_zoom(&self, id: usize) -> Option<u8> {
        let node = self.nodes.get(id)?;
        if node.point.is_some() {
            return None;
        }
        Some(node.formed_zoom + 1)
    }

    fn view(&self, id: usize) -> ClusterView {
        let node = &self.nodes[id];
        match node.point {
            Some(p) => ClusterView::Point(self.points[p].clone()),
            None => ClusterView::Cluster {
                id,
                longitude: unproject_lng(node.x),
                latitude: unproject_lat(node.y),
                count: node.count,
                severity: node.severity,
                timestamps: node.timestamps.clone(),
            },
        }
    }

    fn collect_leaves<'a>(&'a self, id: usize, out: &mut Vec<&'a ClusterPoint>) {
        let node = &self.nodes[id];
        if let Some(p) = node.point {
            out.push(&self.points[p]);
            return;
        }
        for &child in &node.children {
            self.collect_leaves(child, out);
        }
    }
}

/// Clusters one zoom level's nodes, returning the node ids visible at
/// `zoom`. Newly formed clusters are appended to the arena.
#[allow(clippy::cast_precision_loss)]
fn cluster_at_zoom(
    nodes: &mut Vec<Node>,
    current: &[usize],
    zoom: u8,
    config: &ClusterConfig,
) -> Vec<usize> {
    let radius = config.radius_px / (config.tile_px * f64::from(1_u32 << zoom));
    let tree: RTree<TreeEntry> = RTree::bulk_load(
        current
            .iter()
            .map(|&id| TreeEntry::new([nodes[id].x, nodes[id].y], id))
            .collect(),
    );

    let mut processed: HashSet<usize> = HashSet::new();
    let mut next = Vec::new();

    for &id in current {
        if processed.contains(&id) {
            continue;
        }
        processed.insert(id);

        let (x, y) = (nodes[id].x, nodes[id].y);
        let neighbors: Vec<usize> = tree
            .locate_within_distance([x, y], radius * radius)
            .map(|entry| entry.data)
            .filter(|nid| !processed.contains(nid))
            .collect();

        if neighbors.is_empty() {
            next.push(id);
            continue;
        }

        let mut count = nodes[id].count;
        let mut weighted_x = x * count as f64;
        let mut weighted_y = y * count as f64;
        let mut severity = nodes[id].severity;
        let mut timestamps = nodes[id].timestamps.clone();
        let mut children = vec![id];

        for &nid in &neighbors {
            processed.insert(nid);
            let member = &nodes[nid];
            weighted_x += member.x * member.count as f64;
            weighted_y += member.y * member.count as f64;
            count += member.count;
            severity = severity.max(member.severity);
            timestamps.extend_from_slice(&member.timestamps);
            children.push(nid);
        }

        let cluster_id = nodes.len();
        nodes.push(Node {
            x: weighted_x / count as f64,
            y: weighted_y / count as f64,
            count,
            severity,
            timestamps,
            children,
            point: None,
            formed_zoom: zoom,
        });
        next.push(cluster_id);
    }

    next
}

fn project_x(longitude: f64) -> f64 {
    longitude / 360.0 + 0.5
}

fn project_y(latitude: f64) -> f64 {
    let sin = (latitude * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

fn unproject_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

fn unproject_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}
