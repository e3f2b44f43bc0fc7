#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical incident types shared across the campus-safe pipeline.
//!
//! Every feed adapter produces [`NormalizedIncident`] records in this shape,
//! regardless of how the upstream feed structures its rows. The persistence
//! boundary stores them as [`IncidentRecord`]s keyed on
//! `(source, source_incident_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Which external feed (or user-facing path) a record originated from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IncidentSource {
    /// Campus Clery daily crime log (paged DataTables-style feed).
    Clery,
    /// Regional crime-mapping service (filter-object feed).
    CrimeMapping,
    /// Incident reported directly by a user.
    UserReport,
}

/// Coarse incident classification used for severity weighting on the map.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IncidentKind {
    /// Property crimes: robbery, theft, larceny.
    Robbery,
    /// Physical attack or threat of one.
    Assault,
    /// Harassment, stalking, threats.
    Harassment,
    /// Everything else.
    Other,
}

impl IncidentKind {
    /// Severity weight used when aggregating clusters: robbery and assault
    /// score 2, everything else scores 1.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Robbery | Self::Assault => 2,
            Self::Harassment | Self::Other => 1,
        }
    }

    /// Classifies a free-text description into a kind via case-insensitive
    /// keyword matching. Unrecognized text maps to [`Self::Other`].
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("robbery")
            || lower.contains("theft")
            || lower.contains("stolen")
            || lower.contains("larceny")
        {
            return Self::Robbery;
        }
        if lower.contains("assault") || lower.contains("battery") || lower.contains("fight") {
            return Self::Assault;
        }
        if lower.contains("harassment") || lower.contains("stalking") || lower.contains("threat") {
            return Self::Harassment;
        }
        Self::Other
    }
}

/// An incident normalized to the canonical schema.
///
/// All feed adapters produce this type. Coordinates are optional — records
/// without precise lat/lng are stored anyway and picked up by a later
/// geocoding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedIncident {
    /// Which feed produced this record.
    pub source: IncidentSource,
    /// Deduplication key, unique within `source`. Derived from a feed-native
    /// identifier when one exists, otherwise a deterministic composite of
    /// description, location, and raw timestamp.
    pub source_incident_id: String,
    /// Feed-native incident number, if any.
    pub incident_num: Option<String>,
    /// Police case number, if any.
    pub case_number: Option<String>,
    /// Offense classification code from the feed, if any.
    pub offense_code: Option<String>,
    /// Crime-type icon URL from the regional feed, if any.
    pub type_icon_url: Option<String>,
    /// Free-text description. `"Unknown"` when the feed omits it.
    pub description: String,
    /// Best-effort composite location string for display.
    pub location: String,
    /// Named place (building, hall), if the feed provides one.
    pub location_name: Option<String>,
    /// Street address, if the feed provides one.
    pub address: Option<String>,
    /// Cross street, if the feed provides one.
    pub cross_street: Option<String>,
    /// Latitude (WGS84). `None` until geocoding succeeds.
    pub latitude: Option<f64>,
    /// Longitude (WGS84). `None` until geocoding succeeds.
    pub longitude: Option<f64>,
    /// Reporting authority.
    pub agency: String,
    /// When the incident occurred. `None` when the source field is missing
    /// or unparseable.
    pub occurred_at: Option<DateTime<Utc>>,
    /// When the incident was reported, if distinct from occurrence.
    pub reported_at: Option<DateTime<Utc>>,
    /// Case status free text, if any.
    pub disposition: Option<String>,
    /// The original feed row, preserved verbatim for audit and debugging.
    /// Never surfaced to consumers that need clean data.
    pub raw: serde_json::Value,
}

impl NormalizedIncident {
    /// Classifies this incident's kind from its description text.
    #[must_use]
    pub fn kind(&self) -> IncidentKind {
        IncidentKind::classify(&self.description)
    }

    /// Whether both coordinates are present.
    #[must_use]
    pub const fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// A persisted incident: the normalized fields plus store-owned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Store-assigned record id. Never changes after creation.
    pub id: Uuid,
    /// When the record was first created in the store.
    pub created_at: DateTime<Utc>,
    /// The normalized incident fields.
    #[serde(flatten)]
    pub incident: NormalizedIncident,
}

impl IncidentRecord {
    /// The timestamp used for ordering and time-window math:
    /// `occurred_at`, falling back to `reported_at`, then `created_at`.
    #[must_use]
    pub fn effective_occurred_at(&self) -> DateTime<Utc> {
        self.incident
            .occurred_at
            .or(self.incident.reported_at)
            .unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robbery_and_assault_are_high_severity() {
        assert_eq!(IncidentKind::Robbery.severity(), 2);
        assert_eq!(IncidentKind::Assault.severity(), 2);
        assert_eq!(IncidentKind::Harassment.severity(), 1);
        assert_eq!(IncidentKind::Other.severity(), 1);
    }

    #[test]
    fn classifies_descriptions() {
        assert_eq!(IncidentKind::classify("ROBBERY - ARMED"), IncidentKind::Robbery);
        assert_eq!(
            IncidentKind::classify("LARCENY FROM BUILDING"),
            IncidentKind::Robbery
        );
        assert_eq!(IncidentKind::classify("Stolen bicycle"), IncidentKind::Robbery);
        assert_eq!(
            IncidentKind::classify("Aggravated Assault"),
            IncidentKind::Assault
        );
        assert_eq!(IncidentKind::classify("Fight in progress"), IncidentKind::Assault);
        assert_eq!(
            IncidentKind::classify("Stalking complaint"),
            IncidentKind::Harassment
        );
        assert_eq!(
            IncidentKind::classify("Threatening messages"),
            IncidentKind::Harassment
        );
        assert_eq!(IncidentKind::classify("TRESPASS"), IncidentKind::Other);
    }

    #[test]
    fn source_wire_names_are_kebab_case() {
        assert_eq!(IncidentSource::Clery.to_string(), "clery");
        assert_eq!(IncidentSource::CrimeMapping.to_string(), "crime-mapping");
        assert_eq!(IncidentSource::UserReport.to_string(), "user-report");
    }

    #[test]
    fn effective_occurred_at_falls_back() {
        let created = Utc::now();
        let incident = NormalizedIncident {
            source: IncidentSource::Clery,
            source_incident_id: "X".to_string(),
            incident_num: None,
            case_number: None,
            offense_code: None,
            type_icon_url: None,
            description: "Unknown".to_string(),
            location: "Unknown".to_string(),
            location_name: None,
            address: None,
            cross_street: None,
            latitude: None,
            longitude: None,
            agency: "Campus Police".to_string(),
            occurred_at: None,
            reported_at: None,
            disposition: None,
            raw: serde_json::Value::Null,
        };
        let record = IncidentRecord {
            id: Uuid::new_v4(),
            created_at: created,
            incident,
        };
        assert_eq!(record.effective_occurred_at(), created);

        let mut with_reported = record.clone();
        let reported = created - chrono::Duration::hours(2);
        with_reported.incident.reported_at = Some(reported);
        assert_eq!(with_reported.effective_occurred_at(), reported);

        let mut with_occurred = with_reported.clone();
        let occurred = created - chrono::Duration::hours(5);
        with_occurred.incident.occurred_at = Some(occurred);
        assert_eq!(with_occurred.effective_occurred_at(), occurred);
    }
}
