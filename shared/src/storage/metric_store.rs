//! Metric storage trait and implementations.
//!
//! Provides the `MetricStore` trait marking the boundary to the durable
//! store, and an `InMemoryMetricStore` implementation for development and
//! testing. The flush job reads unsent entities and deletes them by record
//! id after a successful upload.

use crate::models::MetricEntity;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during metric store operations.
#[derive(Debug, Error)]
pub enum MetricStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on metric store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Trait for metric storage implementations.
///
/// Implementations must be thread-safe (Send + Sync); the data manager
/// writes from many producer threads while the flush job reads.
pub trait MetricStore: Send + Sync {
    /// Persists a metric entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save(&self, entity: MetricEntity) -> Result<(), MetricStoreError>;

    /// Returns every entity not yet uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn unsent(&self) -> Result<Vec<MetricEntity>, MetricStoreError>;

    /// Deletes entities by record id; unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, record_ids: &[String]) -> Result<(), MetricStoreError>;

    /// Returns the number of stored entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, MetricStoreError>;

    /// Clears all entities from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), MetricStoreError>;
}

/// In-memory metric store implementation.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    entities: Arc<RwLock<Vec<MetricEntity>>>,
}

impl InMemoryMetricStore {
    /// Creates a new empty in-memory metric store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory metric store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl MetricStore for InMemoryMetricStore {
    fn save(&self, entity: MetricEntity) -> Result<(), MetricStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        entities.push(entity);
        Ok(())
    }

    fn unsent(&self) -> Result<Vec<MetricEntity>, MetricStoreError> {
        let entities = self
            .entities
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        Ok(entities.clone())
    }

    fn delete(&self, record_ids: &[String]) -> Result<(), MetricStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        entities.retain(|e| !record_ids.contains(&e.record_id));
        Ok(())
    }

    fn count(&self) -> Result<usize, MetricStoreError> {
        let entities = self
            .entities
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        Ok(entities.len())
    }

    fn clear(&self) -> Result<(), MetricStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        entities.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Metric, MetricType, Session};

    fn entity(session: &Session, name: &str) -> MetricEntity {
        MetricEntity::new(session, Metric::new(name, MetricType::GaugeInt64))
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = InMemoryMetricStore::new();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.unsent().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_read_back() {
        let session = Session::new("s-1");
        let store = InMemoryMetricStore::new();

        store.save(entity(&session, "app.cpu.pct")).unwrap();
        store.save(entity(&session, "app.memory.bytes")).unwrap();

        let unsent = store.unsent().unwrap();
        assert_eq!(unsent.len(), 2);
        assert_eq!(unsent[0].metric.descriptor_name, "app.cpu.pct");
    }

    #[test]
    fn test_delete_by_record_id() {
        let session = Session::new("s-1");
        let store = InMemoryMetricStore::new();

        store.save(entity(&session, "keep")).unwrap();
        let doomed = entity(&session, "remove");
        let doomed_id = doomed.record_id.clone();
        store.save(doomed).unwrap();

        store.delete(&[doomed_id]).unwrap();

        let unsent = store.unsent().unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].metric.descriptor_name, "keep");
    }

    #[test]
    fn test_delete_unknown_id_is_ignored() {
        let session = Session::new("s-1");
        let store = InMemoryMetricStore::new();
        store.save(entity(&session, "keep")).unwrap();

        store.delete(&["not-a-record".to_string()]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_clear_store() {
        let session = Session::new("s-1");
        let store = InMemoryMetricStore::new();
        store.save(entity(&session, "m")).unwrap();

        store.clear().unwrap();

        assert_eq!(store.count().unwrap(), 0);
    }
}
