//! Trace storage trait and implementations.
//!
//! Provides the `TraceStore` trait marking the boundary to the durable
//! store, and an `InMemoryTraceStore` implementation for development and
//! testing. The trace manager writes through its persistence worker; the
//! flush job reads unsent entities and deletes them after upload.

use crate::models::TraceEntity;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during trace store operations.
#[derive(Debug, Error)]
pub enum TraceStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on trace store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Trait for trace storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait TraceStore: Send + Sync {
    /// Persists a trace entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save(&self, entity: TraceEntity) -> Result<(), TraceStoreError>;

    /// Returns every entity not yet uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn unsent(&self) -> Result<Vec<TraceEntity>, TraceStoreError>;

    /// Deletes entities by record id; unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, record_ids: &[String]) -> Result<(), TraceStoreError>;

    /// Returns the number of stored entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, TraceStoreError>;

    /// Clears all entities from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), TraceStoreError>;
}

/// In-memory trace store implementation.
#[derive(Debug, Default)]
pub struct InMemoryTraceStore {
    entities: Arc<RwLock<Vec<TraceEntity>>>,
}

impl InMemoryTraceStore {
    /// Creates a new empty in-memory trace store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory trace store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TraceStore for InMemoryTraceStore {
    fn save(&self, entity: TraceEntity) -> Result<(), TraceStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| TraceStoreError::LockError)?;
        entities.push(entity);
        Ok(())
    }

    fn unsent(&self) -> Result<Vec<TraceEntity>, TraceStoreError> {
        let entities = self
            .entities
            .read()
            .map_err(|_| TraceStoreError::LockError)?;
        Ok(entities.clone())
    }

    fn delete(&self, record_ids: &[String]) -> Result<(), TraceStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| TraceStoreError::LockError)?;
        entities.retain(|e| !record_ids.contains(&e.record_id));
        Ok(())
    }

    fn count(&self) -> Result<usize, TraceStoreError> {
        let entities = self
            .entities
            .read()
            .map_err(|_| TraceStoreError::LockError)?;
        Ok(entities.len())
    }

    fn clear(&self) -> Result<(), TraceStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| TraceStoreError::LockError)?;
        entities.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Span, Trace};

    fn finished_trace(session_id: &str) -> TraceEntity {
        let mut trace = Trace::new(session_id);
        trace.add_span(Span::new("", "0011223344556677", "MainScreen"));
        TraceEntity::from_trace(trace)
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = InMemoryTraceStore::new();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_save_and_read_back() {
        let store = InMemoryTraceStore::new();
        store.save(finished_trace("s-1")).unwrap();
        store.save(finished_trace("s-1")).unwrap();

        let unsent = store.unsent().unwrap();
        assert_eq!(unsent.len(), 2);
        assert_eq!(unsent[0].trace.span_count(), 1);
    }

    #[test]
    fn test_delete_by_record_id() {
        let store = InMemoryTraceStore::new();
        let kept = finished_trace("s-1");
        let doomed = finished_trace("s-1");
        let doomed_id = doomed.record_id.clone();

        store.save(kept.clone()).unwrap();
        store.save(doomed).unwrap();
        store.delete(&[doomed_id]).unwrap();

        let unsent = store.unsent().unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].record_id, kept.record_id);
    }

    #[test]
    fn test_clear_store() {
        let store = InMemoryTraceStore::new();
        store.save(finished_trace("s-1")).unwrap();

        store.clear().unwrap();

        assert_eq!(store.count().unwrap(), 0);
    }
}
