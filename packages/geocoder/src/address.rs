//! Address sanitization and fallback query generation.
//!
//! Campus feeds describe locations institutionally ("Wells Hall Bldg 12",
//! "300 - 400 BLOCK GRAND RIVER AVE"), which a general-purpose geocoder
//! resolves poorly. Fallback queries strip the institutional tokens down
//! to something the geocoder has a chance of matching.

use regex::Regex;
use std::sync::LazyLock;

/// Building designators that confuse street-level geocoding.
static BUILDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:Bldg\.?|Building|Hall)\b").expect("valid regex"));

/// Apartment/suite/unit tokens with their trailing identifier.
static UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Apt|Apartment|Suite|Ste|Unit)\.?\s*\w+|#\s*\w+").expect("valid regex")
});

/// Standalone "BLOCK" noise word.
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bBLOCK\b").expect("valid regex"));

/// Numeric block ranges like "300 - 400".
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*-\s*\d+").expect("valid regex"));

/// Runs of whitespace left behind by the removals above.
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid regex"));

/// Strips building/unit/block tokens and numeric ranges from an address
/// string, collapsing leftover whitespace.
#[must_use]
pub fn sanitize_address(value: &str) -> String {
    let cleaned = BUILDING_RE.replace_all(value, "");
    let cleaned = UNIT_RE.replace_all(&cleaned, "");
    let cleaned = BLOCK_RE.replace_all(&cleaned, "");
    let cleaned = RANGE_RE.replace_all(&cleaned, "");
    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Builds the ordered fallback query list for a location.
///
/// Most-specific first: name + address, name alone, address alone, then
/// sanitized variants when sanitization actually changed something. Every
/// query carries the city context suffix, and duplicates are dropped while
/// preserving order.
#[must_use]
pub fn build_fallback_queries(
    location_name: Option<&str>,
    address: Option<&str>,
    city_context: &str,
) -> Vec<String> {
    let loc = location_name.map(str::trim).unwrap_or_default();
    let addr = address.map(str::trim).unwrap_or_default();
    let loc_clean = if loc.is_empty() {
        String::new()
    } else {
        sanitize_address(loc)
    };
    let addr_clean = if addr.is_empty() {
        String::new()
    } else {
        sanitize_address(addr)
    };

    let mut queries: Vec<String> = Vec::new();

    if !loc.is_empty() && !addr.is_empty() {
        queries.push(format!("{loc}, {addr}, {city_context}"));
    }
    if !loc.is_empty() {
        queries.push(format!("{loc}, {city_context}"));
    }
    if !addr.is_empty() {
        queries.push(format!("{addr}, {city_context}"));
    }
    if !addr_clean.is_empty() && addr_clean != addr {
        queries.push(format!("{addr_clean}, {city_context}"));
    }
    if !loc_clean.is_empty() && loc_clean != loc {
        queries.push(format!("{loc_clean}, {city_context}"));
    }

    dedup_preserving_order(queries)
}

/// Drops duplicate queries while keeping first-occurrence order.
#[must_use]
pub fn dedup_preserving_order(queries: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    queries
        .into_iter()
        .filter(|q| !q.is_empty() && seen.insert(q.clone()))
        .collect()
}
