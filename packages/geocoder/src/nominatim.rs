//! Nominatim / OpenStreetMap geocoder client.
//!
//! Public-instance etiquette requires identifying headers (a descriptive
//! `User-Agent`, ideally a contact email) and at most one request per
//! second. Pacing is the caller's job (see [`crate::enrich`]); this module
//! only issues single requests.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;

use crate::{GeoPoint, GeocodeError, Geocoder};

/// Default Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Configuration for the Nominatim client.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Search endpoint base URL.
    pub base_url: String,
    /// Contact email sent with each request, if configured.
    pub email: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl NominatimConfig {
    /// Builds a config from `GEOCODING_EMAIL` and `GEOCODING_USER_AGENT`
    /// environment variables, with a descriptive default user agent.
    #[must_use]
    pub fn from_env() -> Self {
        let email = std::env::var("GEOCODING_EMAIL").ok();
        let user_agent = std::env::var("GEOCODING_USER_AGENT").unwrap_or_else(|_| {
            email.as_ref().map_or_else(
                || "campus-safe/0.1".to_string(),
                |e| format!("campus-safe/0.1 ({e})"),
            )
        });
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            email,
            user_agent,
        }
    }
}

/// Nominatim-backed [`Geocoder`] implementation.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: NominatimConfig,
}

impl NominatimGeocoder {
    /// Creates a client with the given configuration.
    #[must_use]
    pub const fn new(client: reqwest::Client, config: NominatimConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("q", query.to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(email) = &self.config.email {
            params.push(("email", email.clone()));
        }

        let resp = self
            .client
            .get(&self.config.base_url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept-Language", "en")
            .query(&params)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            // Provider hiccups are treated as "no match" for this query;
            // the enrichment pass moves on to the next fallback.
            log::warn!("nominatim returned {} for query {query:?}", resp.status());
            return Ok(None);
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim JSON response into an optional coordinate.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeoPoint>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let latitude = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let longitude = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Some(GeoPoint {
        latitude,
        longitude,
    }))
}
