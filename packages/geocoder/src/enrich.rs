//! Rate-limited, cached coordinate enrichment.
//!
//! [`apply_geocoding`] walks an ordered list of items that may be missing
//! coordinates and resolves up to a budgeted number of them, trying each
//! item's primary query and then its fallbacks. The pass is strictly
//! serial with a mandatory pause between items — the provider rate-limits,
//! and the pause dominates the latency of a full enrichment run.

use std::collections::HashMap;
use std::time::Duration;

use campus_safe_incident_models::{IncidentRecord, NormalizedIncident};

use crate::{GeoPoint, Geocoder};

/// Anything with optional coordinates that enrichment can fill in.
pub trait Coordinates {
    /// Current latitude, if any.
    fn latitude(&self) -> Option<f64>;
    /// Current longitude, if any.
    fn longitude(&self) -> Option<f64>;
    /// Stores a resolved coordinate pair.
    fn set_coordinates(&mut self, latitude: f64, longitude: f64);
}

impl Coordinates for NormalizedIncident {
    fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    fn set_coordinates(&mut self, latitude: f64, longitude: f64) {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
    }
}

impl Coordinates for IncidentRecord {
    fn latitude(&self) -> Option<f64> {
        self.incident.latitude
    }

    fn longitude(&self) -> Option<f64> {
        self.incident.longitude
    }

    fn set_coordinates(&mut self, latitude: f64, longitude: f64) {
        self.incident.latitude = Some(latitude);
        self.incident.longitude = Some(longitude);
    }
}

/// Budget and pacing for one enrichment pass.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Maximum number of items that receive a resolution attempt.
    pub max: usize,
    /// Pause after each attempted item. Applied whether or not the item's
    /// queries were served from the cache — the pacing contract is per
    /// item, not per wire call.
    pub delay: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            max: 25,
            delay: Duration::from_millis(1100),
        }
    }
}

/// Resolves coordinates for up to `options.max` items, in place.
///
/// For each item still missing coordinates, the primary query from
/// `query_fn` is tried first, then each fallback from `fallback_fn` in
/// order, short-circuiting on the first hit. Query strings are cached for
/// the duration of the run: once a string has resolved (or definitively
/// missed), it is never sent to the provider again, even across items.
///
/// Items that already have both coordinates, or that produce no queries at
/// all, are skipped without consuming budget. Provider errors degrade to a
/// miss for that query; exhaustion of all queries leaves the item
/// untouched for a future run.
///
/// Returns the number of items that were resolved.
pub async fn apply_geocoding<T, Q, F>(
    geocoder: &dyn Geocoder,
    items: &mut [T],
    query_fn: Q,
    fallback_fn: F,
    options: &EnrichOptions,
) -> usize
where
    T: Coordinates,
    Q: Fn(&T) -> Option<String>,
    F: Fn(&T) -> Vec<String>,
{
    if options.max == 0 {
        return 0;
    }

    let mut cache: HashMap<String, Option<GeoPoint>> = HashMap::new();
    let mut attempted = 0usize;
    let mut resolved = 0usize;

    for item in items.iter_mut() {
        if attempted >= options.max {
            break;
        }
        if item.latitude().is_some() && item.longitude().is_some() {
            continue;
        }

        let mut queries: Vec<String> = Vec::new();
        if let Some(primary) = query_fn(item) {
            queries.push(primary);
        }
        queries.extend(fallback_fn(item));
        let queries = crate::address::dedup_preserving_order(queries);

        if queries.is_empty() {
            continue;
        }

        let mut result: Option<GeoPoint> = None;
        for query in &queries {
            result = if let Some(cached) = cache.get(query) {
                *cached
            } else {
                let fresh = match geocoder.forward(query).await {
                    Ok(point) => point,
                    Err(e) => {
                        log::warn!("geocode miss for {query:?}: {e}");
                        None
                    }
                };
                cache.insert(query.clone(), fresh);
                fresh
            };

            if result.is_some() {
                break;
            }
        }

        if let Some(point) = result {
            item.set_coordinates(point.latitude, point.longitude);
            resolved += 1;
        }

        attempted += 1;
        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    log::info!("geocoding pass: {attempted} attempted, {resolved} resolved");
    resolved
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::GeocodeError;

    use super::*;

    /// Test double that records every query it receives.
    struct MockGeocoder {
        answers: HashMap<String, GeoPoint>,
        calls: Mutex<Vec<String>>,
    }

    impl MockGeocoder {
        fn new(answers: &[(&str, f64, f64)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(q, lat, lng)| {
                        ((*q).to_string(), GeoPoint {
                            latitude: *lat,
                            longitude: *lng,
                        })
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self, query: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|q| q.as_str() == query)
                .count()
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn forward(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
            self.calls.lock().unwrap().push(query.to_string());
            Ok(self.answers.get(query).copied())
        }
    }

    #[derive(Debug, Clone)]
    struct Item {
        query: Option<String>,
        fallbacks: Vec<String>,
        lat: Option<f64>,
        lng: Option<f64>,
    }

    impl Item {
        fn pending(query: &str) -> Self {
            Self {
                query: Some(query.to_string()),
                fallbacks: Vec::new(),
                lat: None,
                lng: None,
            }
        }
    }

    impl Coordinates for Item {
        fn latitude(&self) -> Option<f64> {
            self.lat
        }

        fn longitude(&self) -> Option<f64> {
            self.lng
        }

        fn set_coordinates(&mut self, latitude: f64, longitude: f64) {
            self.lat = Some(latitude);
            self.lng = Some(longitude);
        }
    }

    fn instant_options(max: usize) -> EnrichOptions {
        EnrichOptions {
            max,
            delay: Duration::ZERO,
        }
    }

    async fn run(geocoder: &MockGeocoder, items: &mut [Item], max: usize) -> usize {
        apply_geocoding(
            geocoder,
            items,
            |item: &Item| item.query.clone(),
            |item: &Item| item.fallbacks.clone(),
            &instant_options(max),
        )
        .await
    }

    #[tokio::test]
    async fn resolves_and_mutates_in_place() {
        let geocoder = MockGeocoder::new(&[("Wells Hall", 42.72, -84.48)]);
        let mut items = vec![Item::pending("Wells Hall")];
        let resolved = run(&geocoder, &mut items, 10).await;
        assert_eq!(resolved, 1);
        assert_eq!(items[0].lat, Some(42.72));
        assert_eq!(items[0].lng, Some(-84.48));
    }

    #[tokio::test]
    async fn shared_query_hits_provider_once() {
        let geocoder = MockGeocoder::new(&[("Main Library", 42.73, -84.48)]);
        let mut items = vec![Item::pending("Main Library"), Item::pending("Main Library")];
        let resolved = run(&geocoder, &mut items, 10).await;
        assert_eq!(resolved, 2);
        assert_eq!(geocoder.call_count("Main Library"), 1);
    }

    #[tokio::test]
    async fn misses_are_cached_too() {
        let geocoder = MockGeocoder::new(&[]);
        let mut items = vec![Item::pending("Nowhere"), Item::pending("Nowhere")];
        let resolved = run(&geocoder, &mut items, 10).await;
        assert_eq!(resolved, 0);
        assert_eq!(geocoder.call_count("Nowhere"), 1);
    }

    #[tokio::test]
    async fn budget_caps_attempts() {
        let geocoder = MockGeocoder::new(&[]);
        let mut items = vec![
            Item::pending("a"),
            Item::pending("b"),
            Item::pending("c"),
            Item::pending("d"),
        ];
        run(&geocoder, &mut items, 2).await;
        assert_eq!(geocoder.total_calls(), 2);
    }

    #[tokio::test]
    async fn zero_budget_does_nothing() {
        let geocoder = MockGeocoder::new(&[("a", 1.0, 2.0)]);
        let mut items = vec![Item::pending("a")];
        assert_eq!(run(&geocoder, &mut items, 0).await, 0);
        assert_eq!(geocoder.total_calls(), 0);
    }

    #[tokio::test]
    async fn items_with_coordinates_are_skipped_without_budget() {
        let geocoder = MockGeocoder::new(&[("pending", 3.0, 4.0)]);
        let mut done = Item::pending("done");
        done.lat = Some(1.0);
        done.lng = Some(2.0);
        let mut items = vec![done, Item::pending("pending")];

        // Budget of 1 still reaches the second item because the first
        // consumes nothing.
        let resolved = run(&geocoder, &mut items, 1).await;
        assert_eq!(resolved, 1);
        assert_eq!(geocoder.call_count("done"), 0);
        assert_eq!(items[1].lat, Some(3.0));
    }

    #[tokio::test]
    async fn queryless_items_consume_no_budget() {
        let geocoder = MockGeocoder::new(&[("real", 5.0, 6.0)]);
        let no_query = Item {
            query: None,
            fallbacks: Vec::new(),
            lat: None,
            lng: None,
        };
        let mut items = vec![no_query, Item::pending("real")];
        let resolved = run(&geocoder, &mut items, 1).await;
        assert_eq!(resolved, 1);
    }

    #[tokio::test]
    async fn fallbacks_short_circuit_on_first_hit() {
        let geocoder = MockGeocoder::new(&[("second", 7.0, 8.0)]);
        let mut item = Item::pending("first");
        item.fallbacks = vec!["second".to_string(), "third".to_string()];
        let mut items = vec![item];

        let resolved = run(&geocoder, &mut items, 10).await;
        assert_eq!(resolved, 1);
        assert_eq!(geocoder.call_count("first"), 1);
        assert_eq!(geocoder.call_count("second"), 1);
        assert_eq!(geocoder.call_count("third"), 0);
    }

    #[tokio::test]
    async fn exhausted_fallbacks_leave_item_untouched() {
        let geocoder = MockGeocoder::new(&[]);
        let mut item = Item::pending("first");
        item.fallbacks = vec!["second".to_string()];
        let mut items = vec![item];

        let resolved = run(&geocoder, &mut items, 10).await;
        assert_eq!(resolved, 0);
        assert!(items[0].lat.is_none());
        assert!(items[0].lng.is_none());
    }
}
