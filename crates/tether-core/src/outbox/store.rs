//! Outbox store: the job sequence serialized under a single storage key.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::Job;
use crate::ports::{KeyValueStorage, StorageError};

/// Default storage key for the serialized queue.
pub const DEFAULT_STORAGE_KEY: &str = "outbox:v1";

/// Loads and saves the whole outbox as one JSON array.
#[derive(Clone)]
pub struct OutboxStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl OutboxStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted jobs in stored order.
    ///
    /// Never fails: a read error, missing value or corrupt data all yield an
    /// empty outbox. Duplicate ids keep their first occurrence.
    pub async fn load(&self) -> Vec<Job> {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read outbox, starting empty");
                return Vec::new();
            }
        };

        let jobs: Vec<Job> = match serde_json::from_str(&raw) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Corrupt outbox data, starting empty");
                return Vec::new();
            }
        };

        let mut seen = HashSet::with_capacity(jobs.len());
        let mut unique = Vec::with_capacity(jobs.len());
        for job in jobs {
            if seen.insert(job.id) {
                unique.push(job);
            } else {
                warn!(key = %self.key, job_id = %job.id, "Dropping duplicate job id");
            }
        }

        debug!(key = %self.key, count = unique.len(), "Loaded outbox");
        unique
    }

    /// Overwrite the persisted representation with `jobs`.
    pub async fn save(&self, jobs: &[Job]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(jobs)?;
        self.storage.set(&self.key, raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryError, FailureClass, JobId, ReasonCode, Target, VisitorRecord};
    use crate::impls::InMemoryStorage;
    use chrono::{NaiveDate, Utc};
    use ulid::Ulid;

    fn job(nombre: &str) -> Job {
        let payload = VisitorRecord::new(
            NaiveDate::from_ymd_opt(2025, 9, 9).unwrap(),
            nombre,
            "San Martín",
            1,
            0,
            0,
        )
        .unwrap();
        Job::insert(JobId::from_ulid(Ulid::new()), Target::default(), payload, Utc::now())
    }

    fn store() -> (Arc<InMemoryStorage>, OutboxStore) {
        let storage = Arc::new(InMemoryStorage::new());
        let store = OutboxStore::new(storage.clone(), DEFAULT_STORAGE_KEY);
        (storage, store)
    }

    #[tokio::test]
    async fn load_without_data_is_empty() {
        let (_, store) = store();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_keeps_order_and_retry_fields() {
        let (_, store) = store();
        let mut failed = job("Ana");
        failed.record_failure(
            &DeliveryError::new(ReasonCode::Server, "503"),
            FailureClass::Transient,
        );
        let mut quarantined = job("Beto");
        quarantined.record_failure(
            &DeliveryError::new(ReasonCode::NotFound, "no table"),
            FailureClass::Fatal,
        );
        quarantined.quarantine();
        let jobs = vec![failed, quarantined, job("Carla")];

        store.save(&jobs).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded, jobs);
    }

    #[tokio::test]
    async fn corrupt_data_yields_empty() {
        let (storage, store) = store();
        storage
            .set(DEFAULT_STORAGE_KEY, "{not json".to_string())
            .await
            .unwrap();

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn read_failure_yields_empty() {
        let (storage, store) = store();
        store.save(&[job("Ana")]).await.unwrap();
        storage.set_fail_reads(true);

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_ids_keep_first_occurrence() {
        let (_, store) = store();
        let first = job("Ana");
        let mut dup = job("Impostor");
        dup.id = first.id;
        let last = job("Carla");

        store.save(&[first.clone(), dup, last.clone()]).await.unwrap();

        assert_eq!(store.load().await, vec![first, last]);
    }

    #[tokio::test]
    async fn save_surfaces_write_failure() {
        let (storage, store) = store();
        storage.set_fail_writes(true);

        let err = store.save(&[job("Ana")]).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
