//! Regional crime-mapping service adapter.
//!
//! The service takes a POST with a single form field `paramFilt` whose
//! value is a JSON filter object (category selection, spatial filter
//! rings, explicit date window). Responses are keyed JSON objects, but two
//! fields arrive as embedded HTML snippets that have to be picked apart
//! with pattern matching:
//!
//! - `Type` is an `<img>` tag whose `src` path carries the numeric crime
//!   type id (`IncidentType/Identify/<id>.svg`) and the icon URL itself;
//! - `MapIt` is an anchor with an inline `onclick="ReportMapIt('<id>')"`
//!   handler carrying the map-item identifier used for deduplication.
//!
//! Timestamps are 14-digit `YYYYMMDDHHMMSS` blobs in campus local time.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use campus_safe_incident_models::{IncidentSource, NormalizedIncident};

use crate::SourceError;
use crate::parsing::{non_empty_str, parse_compact_local_datetime};

/// Default crime-mapping read endpoint.
pub const DEFAULT_CRIME_MAPPING_URL: &str = "https://www.crimemapping.com/Map/CrimeIncidents_Read";

/// All selectable crime category ids.
const DEFAULT_CATEGORIES: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15",
];

/// Spatial filter polygon covering the campus area (Web Mercator rings,
/// as the service expects them).
const DEFAULT_SPATIAL_FILTER: &str = "{\"rings\":[[[-9426211.818598758,5258790.627781184],[-9426211.818598758,5284320.595228398],[-9370374.569436513,5284320.595228398],[-9370374.569436513,5258790.627781184],[-9426211.818598758,5258790.627781184]]],\"spatialReference\":{\"wkid\":102100}}";

/// Crime type id embedded in the `Type` icon path.
static TYPE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)IncidentType/Identify/(\d+)\.svg").expect("valid regex"));

/// Full icon URL in the `Type` snippet's `src` attribute.
static TYPE_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)src="([^"]+)""#).expect("valid regex"));

/// Map-item id embedded in the `MapIt` onclick handler.
static MAP_IT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ReportMapIt\('([^']+)'\)").expect("valid regex"));

/// Envelope returned by the read endpoint.
#[derive(Debug, Deserialize)]
pub struct CrimeMappingResponse {
    /// The raw incident objects.
    #[serde(rename = "Data", default)]
    pub data: Vec<serde_json::Value>,
    /// Total matching incidents on the server.
    #[serde(rename = "Total", default)]
    pub total: u64,
}

/// Builds the `paramFilt` JSON filter object for a date window.
#[must_use]
pub fn build_param_filt(start: DateTime<Utc>, end: DateTime<Utc>) -> serde_json::Value {
    json!({
        "SelectedCategories": DEFAULT_CATEGORIES,
        "SpatialFilter": {
            "FilterType": 2,
            "Filter": DEFAULT_SPATIAL_FILTER,
        },
        "TemporalFilter": {
            "PreviousID": "3",
            "PreviousNumDays": 7,
            "PreviousName": "Previous Week",
            "FilterType": "Previous",
            "ExplicitStartDate": start.format("%Y%m%d").to_string(),
            "ExplicitEndDate": end.format("%Y%m%d").to_string(),
        },
        "AgencyFilter": [],
    })
}

/// Fetches incidents for a date window.
///
/// # Errors
///
/// Returns [`SourceError::Fetch`] when the feed responds with a non-success
/// status, or [`SourceError::Http`]/[`SourceError::Json`] for transport and
/// body decoding failures.
pub async fn fetch_crime_mapping(
    client: &reqwest::Client,
    base_url: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<CrimeMappingResponse, SourceError> {
    log::info!(
        "crime-mapping: fetching {} to {}",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );

    let param_filt = build_param_filt(start, end);

    let response = client
        .post(base_url)
        .form(&[("paramFilt", param_filt.to_string())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Fetch { status });
    }

    Ok(response.json().await?)
}

/// Extracts the numeric crime type id from the `Type` HTML snippet.
/// Absence or an unexpected embedding format yields `None`, not an error.
#[must_use]
pub fn extract_type_id(type_html: Option<&str>) -> Option<String> {
    TYPE_ID_RE
        .captures(type_html?)
        .map(|caps| caps[1].to_string())
}

/// Extracts the crime-type icon URL from the `Type` HTML snippet.
#[must_use]
pub fn extract_type_icon_url(type_html: Option<&str>) -> Option<String> {
    TYPE_SRC_RE
        .captures(type_html?)
        .map(|caps| caps[1].to_string())
}

/// Extracts the map-item id from the `MapIt` onclick snippet.
#[must_use]
pub fn extract_map_it_id(map_it_html: Option<&str>) -> Option<String> {
    MAP_IT_RE
        .captures(map_it_html?)
        .map(|caps| caps[1].to_string())
}

/// Normalizes raw crime-mapping objects into canonical incidents.
///
/// The dedup key is the map-item id when the `MapIt` snippet yields one,
/// otherwise a deterministic composite of incident number, description,
/// and the raw date blob.
#[must_use]
pub fn normalize_crime_mapping(rows: &[serde_json::Value]) -> Vec<NormalizedIncident> {
    rows.iter()
        .map(|item| {
            let description = non_empty_str(item.get("Description"))
                .unwrap_or("Unknown")
                .to_string();
            let incident_num = non_empty_str(item.get("IncidentNum")).map(str::to_string);
            let location = non_empty_str(item.get("Location"))
                .unwrap_or("Unknown")
                .to_string();
            let agency = non_empty_str(item.get("Agency"))
                .unwrap_or("Unknown")
                .to_string();

            let type_id = extract_type_id(non_empty_str(item.get("Type")));
            let type_icon_url = extract_type_icon_url(non_empty_str(item.get("Type")));
            let map_it_id = extract_map_it_id(non_empty_str(item.get("MapIt")));

            let date_raw = item.get("Date").and_then(date_value);
            let occurred_at = date_raw.and_then(parse_compact_local_datetime);

            let source_incident_id = map_it_id.unwrap_or_else(|| {
                format!(
                    "{}:{description}:{}",
                    incident_num.as_deref().unwrap_or("unknown"),
                    date_raw.map_or_else(|| "unknown".to_string(), |d| d.to_string()),
                )
            });

            NormalizedIncident {
                source: IncidentSource::CrimeMapping,
                source_incident_id,
                incident_num,
                case_number: None,
                offense_code: type_id,
                type_icon_url,
                description,
                location,
                location_name: None,
                address: None,
                cross_street: None,
                latitude: None,
                longitude: None,
                agency,
                occurred_at,
                reported_at: None,
                disposition: None,
                raw: item.clone(),
            }
        })
        .collect()
}

/// Reads the `Date` field, which has been observed as both a JSON number
/// and a numeric string.
fn date_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use serde_json::json;

    use super::*;

    fn full_item() -> serde_json::Value {
        json!({
            "ID": "abc",
            "Type": "<img src=\"https://cdn.example.com/IncidentType/Identify/14.svg\" />",
            "Description": "ROBBERY",
            "IncidentNum": "EL-2024-0042",
            "Location": "300 BLOCK W GRAND RIVER AVE",
            "Agency": "East Lansing PD",
            "Date": 20_240_115_143_000_i64,
            "MapIt": "<a onclick=\"ReportMapIt('MI77421')\">Map It</a>",
        })
    }

    #[test]
    fn normalizes_full_item() {
        let incidents = normalize_crime_mapping(&[full_item()]);
        assert_eq!(incidents.len(), 1);
        let inc = &incidents[0];
        assert_eq!(inc.source, IncidentSource::CrimeMapping);
        assert_eq!(inc.source_incident_id, "MI77421");
        assert_eq!(inc.offense_code.as_deref(), Some("14"));
        assert_eq!(
            inc.type_icon_url.as_deref(),
            Some("https://cdn.example.com/IncidentType/Identify/14.svg")
        );
        assert_eq!(inc.incident_num.as_deref(), Some("EL-2024-0042"));
        // 14:30 campus local = 19:30 UTC
        assert_eq!(
            inc.occurred_at.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 19, 30, 0).unwrap()
        );
        assert_eq!(inc.raw, full_item());
    }

    #[test]
    fn missing_map_it_gets_composite_key() {
        let mut item = full_item();
        item.as_object_mut().unwrap().remove("MapIt");
        let incidents = normalize_crime_mapping(&[item]);
        assert_eq!(
            incidents[0].source_incident_id,
            "EL-2024-0042:ROBBERY:20240115143000"
        );
    }

    #[test]
    fn composite_key_is_deterministic_across_passes() {
        let mut item = full_item();
        item.as_object_mut().unwrap().remove("MapIt");
        let rows = vec![item];
        assert_eq!(
            normalize_crime_mapping(&rows)[0].source_incident_id,
            normalize_crime_mapping(&rows)[0].source_incident_id
        );
    }

    #[test]
    fn malformed_snippets_yield_none() {
        assert!(extract_type_id(Some("<img src=\"plain.png\" />")).is_none());
        assert!(extract_type_id(None).is_none());
        assert!(extract_type_icon_url(Some("<img alt=\"no src\" />")).is_none());
        assert!(extract_map_it_id(Some("<a href=\"#\">Map It</a>")).is_none());
        assert!(extract_map_it_id(None).is_none());
    }

    #[test]
    fn snippet_extraction_ignores_case() {
        let snippet = "<IMG SRC=\"https://cdn.example.com/incidenttype/identify/7.SVG\" />";
        assert_eq!(extract_type_id(Some(snippet)).as_deref(), Some("7"));
        assert_eq!(
            extract_type_icon_url(Some(snippet)).as_deref(),
            Some("https://cdn.example.com/incidenttype/identify/7.SVG")
        );
    }

    #[test]
    fn missing_date_is_none_not_error() {
        let mut item = full_item();
        item.as_object_mut().unwrap().remove("Date");
        let incidents = normalize_crime_mapping(&[item]);
        assert!(incidents[0].occurred_at.is_none());
    }

    #[test]
    fn date_as_string_still_parses() {
        let mut item = full_item();
        item.as_object_mut()
            .unwrap()
            .insert("Date".to_string(), json!("20240115143000"));
        let incidents = normalize_crime_mapping(&[item]);
        assert!(incidents[0].occurred_at.is_some());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let mut item = full_item();
        item.as_object_mut()
            .unwrap()
            .insert("BrandNewField".to_string(), json!({"nested": true}));
        let incidents = normalize_crime_mapping(&[item]);
        assert_eq!(incidents[0].description, "ROBBERY");
    }

    #[test]
    fn empty_item_defaults_everything() {
        let incidents = normalize_crime_mapping(&[json!({})]);
        let inc = &incidents[0];
        assert_eq!(inc.description, "Unknown");
        assert_eq!(inc.location, "Unknown");
        assert_eq!(inc.agency, "Unknown");
        assert_eq!(inc.source_incident_id, "unknown:Unknown:unknown");
    }

    #[test]
    fn param_filt_formats_dates_compact() {
        let start = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let filt = build_param_filt(start, end);
        assert_eq!(filt["TemporalFilter"]["ExplicitStartDate"], "20240108");
        assert_eq!(filt["TemporalFilter"]["ExplicitEndDate"], "20240115");
        assert_eq!(filt["SelectedCategories"].as_array().unwrap().len(), 15);
    }
}
