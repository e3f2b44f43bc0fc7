//! In-memory reference implementation of [`IncidentStore`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use campus_safe_incident_models::{IncidentRecord, IncidentSource, NormalizedIncident};
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{IncidentQuery, IncidentStore, StoreError, UpsertOutcome};

type IdentityKey = (IncidentSource, String);

/// Keyed in-memory incident store.
///
/// Backs tests and local development; the production deployment swaps in a
/// real storage engine behind the same trait.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<IdentityKey, IncidentRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn upsert(&self, incident: NormalizedIncident) -> Result<UpsertOutcome, StoreError> {
        let key = (incident.source, incident.source_incident_id.clone());
        let mut records = self.records.write().await;

        if let Some(existing) = records.get_mut(&key) {
            // Identity, id, and created_at survive; everything else is
            // overwritten by the newer normalized record.
            existing.incident = incident;
            Ok(UpsertOutcome {
                record: existing.clone(),
                created: false,
            })
        } else {
            let record = IncidentRecord {
                id: Uuid::new_v4(),
                created_at: Utc::now(),
                incident,
            };
            records.insert(key, record.clone());
            Ok(UpsertOutcome {
                record,
                created: true,
            })
        }
    }

    async fn find(&self, query: &IncidentQuery) -> Result<Vec<IncidentRecord>, StoreError> {
        let records = self.records.read().await;

        let mut matches: Vec<IncidentRecord> = records
            .values()
            .filter(|r| query.source.is_none_or(|s| r.incident.source == s))
            .filter(|r| {
                query
                    .has_coordinates
                    .is_none_or(|want| r.incident.has_coordinates() == want)
            })
            .filter(|r| {
                query
                    .occurred_from
                    .is_none_or(|from| r.effective_occurred_at() >= from)
            })
            .filter(|r| {
                query
                    .occurred_to
                    .is_none_or(|to| r.effective_occurred_at() <= to)
            })
            .cloned()
            .collect();

        matches.sort_by_key(|r| std::cmp::Reverse(r.effective_occurred_at()));
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }

        Ok(matches)
    }

    async fn set_coordinates(
        &self,
        id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .values_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound { id })?;
        record.incident.latitude = Some(latitude);
        record.incident.longitude = Some(longitude);
        Ok(())
    }
}
