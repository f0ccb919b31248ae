//! Resource label storage trait and implementations.
//!
//! Resource labels are session-scoped facts; the flush jobs attach a
//! session's labels to every outgoing batch as its resource snapshot, so
//! unlike metrics and traces they are not deleted after upload.

use crate::models::ResourceEntity;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during resource store operations.
#[derive(Debug, Error)]
pub enum ResourceStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on resource store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Trait for resource label storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait ResourceStore: Send + Sync {
    /// Persists a resource entity.
    ///
    /// A later entity with the same label name and session replaces the
    /// earlier fact in the session snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save(&self, entity: ResourceEntity) -> Result<(), ResourceStoreError>;

    /// Returns the entities captured in the given session, insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn for_session(&self, session_id: &str) -> Result<Vec<ResourceEntity>, ResourceStoreError>;

    /// Returns the number of stored entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, ResourceStoreError>;

    /// Clears all entities from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), ResourceStoreError>;
}

/// In-memory resource store implementation.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    entities: Arc<RwLock<Vec<ResourceEntity>>>,
}

impl InMemoryResourceStore {
    /// Creates a new empty in-memory resource store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory resource store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl ResourceStore for InMemoryResourceStore {
    fn save(&self, entity: ResourceEntity) -> Result<(), ResourceStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| ResourceStoreError::LockError)?;
        entities.retain(|e| {
            e.session_id != entity.session_id || e.label.name != entity.label.name
        });
        entities.push(entity);
        Ok(())
    }

    fn for_session(&self, session_id: &str) -> Result<Vec<ResourceEntity>, ResourceStoreError> {
        let entities = self
            .entities
            .read()
            .map_err(|_| ResourceStoreError::LockError)?;
        Ok(entities
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, ResourceStoreError> {
        let entities = self
            .entities
            .read()
            .map_err(|_| ResourceStoreError::LockError)?;
        Ok(entities.len())
    }

    fn clear(&self) -> Result<(), ResourceStoreError> {
        let mut entities = self
            .entities
            .write()
            .map_err(|_| ResourceStoreError::LockError)?;
        entities.clear();
        Ok(())
    }
}
