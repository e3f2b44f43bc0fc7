//! Campus Clery daily crime log adapter.
//!
//! The Clery log is published through a DataTables-style endpoint: POST a
//! form-urlencoded body with `draw`/`start`/`length` paging and get back a
//! JSON envelope whose `data` is an array of fixed-position rows. Column
//! order is part of the feed contract:
//!
//! 0. offense description
//! 1. offense code
//! 2. location name
//! 3. address
//! 4. cross street
//! 5. occurred at
//! 6. reported at
//! 7. case number
//! 8. disposition

use campus_safe_incident_models::{IncidentSource, NormalizedIncident};
use serde::Deserialize;

use crate::SourceError;
use crate::parsing::{non_empty_str, parse_feed_datetime};

/// Default Clery log endpoint.
pub const DEFAULT_CLERY_URL: &str = "https://go.msu.edu/clery.php";

/// Reporting authority for Clery log records.
pub const CLERY_AGENCY: &str = "MSU Police";

const COL_DESCRIPTION: usize = 0;
const COL_OFFENSE_CODE: usize = 1;
const COL_LOCATION_NAME: usize = 2;
const COL_ADDRESS: usize = 3;
const COL_CROSS_STREET: usize = 4;
const COL_OCCURRED_AT: usize = 5;
const COL_REPORTED_AT: usize = 6;
const COL_CASE_NUMBER: usize = 7;
const COL_DISPOSITION: usize = 8;

/// Paging parameters for the DataTables protocol.
#[derive(Debug, Clone)]
pub struct CleryPaging {
    /// Row offset to start from.
    pub start: u64,
    /// Number of rows to fetch.
    pub length: u64,
    /// DataTables draw counter (echoed back by the server).
    pub draw: u32,
}

impl Default for CleryPaging {
    fn default() -> Self {
        Self {
            start: 0,
            length: 100,
            draw: 1,
        }
    }
}

/// Envelope returned by the Clery endpoint.
///
/// Field types are deliberately loose (`serde_json::Value`) because the
/// upstream has been observed returning `recordsTotal` as a string and
/// `recordsFiltered` as a number; drift here must not fail the batch.
#[derive(Debug, Deserialize)]
pub struct CleryResponse {
    /// Echoed draw counter.
    #[serde(default)]
    pub draw: serde_json::Value,
    /// Total rows available on the server.
    #[serde(rename = "recordsTotal", default)]
    pub records_total: serde_json::Value,
    /// Rows matching the (unused) search filter.
    #[serde(rename = "recordsFiltered", default)]
    pub records_filtered: serde_json::Value,
    /// The page of fixed-position rows.
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

impl CleryResponse {
    /// Total rows available, tolerating string or numeric encoding.
    #[must_use]
    pub fn total_available(&self) -> u64 {
        match &self.records_total {
            serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
            other => other.as_u64().unwrap_or(0),
        }
    }
}

/// Fetches one page of the Clery log.
///
/// # Errors
///
/// Returns [`SourceError::Fetch`] when the feed responds with a non-success
/// status, or [`SourceError::Http`]/[`SourceError::Json`] for transport and
/// body decoding failures.
pub async fn fetch_clery(
    client: &reqwest::Client,
    base_url: &str,
    paging: &CleryPaging,
) -> Result<CleryResponse, SourceError> {
    log::info!(
        "clery: fetching start={} length={}",
        paging.start,
        paging.length
    );

    let response = client
        .post(base_url)
        .form(&[
            ("draw", paging.draw.to_string()),
            ("start", paging.start.to_string()),
            ("length", paging.length.to_string()),
            ("search[value]", String::new()),
            ("search[regex]", "false".to_string()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Fetch { status });
    }

    Ok(response.json().await?)
}

/// Normalizes a page of Clery rows into canonical incidents.
///
/// Row-level parsing never fails: missing cells default to `None` or
/// `"Unknown"`, and unparseable timestamps become `None`. The dedup key is
/// the case number when present, otherwise a deterministic composite of
/// description, location, and the raw occurred-at string, so re-fetching an
/// overlapping window produces identical keys.
#[must_use]
pub fn normalize_clery(rows: &[serde_json::Value]) -> Vec<NormalizedIncident> {
    rows.iter()
        .map(|row| {
            let empty = Vec::new();
            let cells = row.as_array().unwrap_or(&empty);

            let description = non_empty_str(cells.get(COL_DESCRIPTION))
                .unwrap_or("Unknown")
                .to_string();
            let offense_code = non_empty_str(cells.get(COL_OFFENSE_CODE)).map(str::to_string);
            let location_name = non_empty_str(cells.get(COL_LOCATION_NAME));
            let address = non_empty_str(cells.get(COL_ADDRESS));
            let cross_street = non_empty_str(cells.get(COL_CROSS_STREET)).map(str::to_string);
            let occurred_raw = non_empty_str(cells.get(COL_OCCURRED_AT));
            let reported_raw = non_empty_str(cells.get(COL_REPORTED_AT));
            let case_number = non_empty_str(cells.get(COL_CASE_NUMBER)).map(str::to_string);
            let disposition = non_empty_str(cells.get(COL_DISPOSITION)).map(str::to_string);

            let occurred_at = parse_feed_datetime(occurred_raw);
            let reported_at = parse_feed_datetime(reported_raw);

            let location = compose_location(location_name, address);

            let source_incident_id = case_number.clone().unwrap_or_else(|| {
                format!(
                    "{description}:{location}:{}",
                    occurred_raw.unwrap_or("unknown")
                )
            });

            NormalizedIncident {
                source: IncidentSource::Clery,
                source_incident_id,
                incident_num: case_number.clone(),
                case_number,
                offense_code,
                type_icon_url: None,
                description,
                location,
                location_name: location_name.map(str::to_string),
                address: address.map(str::to_string),
                cross_street,
                latitude: None,
                longitude: None,
                agency: CLERY_AGENCY.to_string(),
                occurred_at,
                reported_at,
                disposition,
                raw: row.clone(),
            }
        })
        .collect()
}

/// Composes the display location with the feed's exact precedence:
/// joined `name - address` pieces, then address, then name, then
/// `"Unknown"`.
fn compose_location(location_name: Option<&str>, address: Option<&str>) -> String {
    let pieces: Vec<&str> = [location_name, address].into_iter().flatten().collect();
    let joined = pieces.join(" - ");
    if !joined.is_empty() {
        joined
    } else if let Some(addr) = address {
        addr.to_string()
    } else if let Some(name) = location_name {
        name.to_string()
    } else {
        "Unknown".to_string()
    }
}
