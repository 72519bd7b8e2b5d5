//! In-memory weight store for tests and throwaway runs.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    Result,
    error::Error,
    ports::{WeightStore, Weights},
};

/// Weight store backed by a shared map of MessagePack blobs.
///
/// Clones share the same storage, so a test can keep a handle while the
/// pipeline owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWeightStore {
    storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryWeightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored weight sets.
    pub fn count(&self) -> usize {
        self.storage().len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.storage().contains_key(name)
    }

    pub fn clear(&self) {
        self.storage().clear();
    }

    fn storage(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WeightStore for InMemoryWeightStore {
    fn save(&self, name: &str, weights: &Weights) -> Result<()> {
        let bytes = rmp_serde::to_vec(weights).map_err(|e| Error::SerializationContext {
            operation: format!("serialize weights '{name}' for in-memory storage"),
            message: e.to_string(),
        })?;
        self.storage().insert(name.to_string(), bytes);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Weights>> {
        let storage = self.storage();
        let Some(bytes) = storage.get(name) else {
            return Ok(None);
        };
        rmp_serde::from_slice(bytes)
            .map(Some)
            .map_err(|e| Error::SerializationContext {
                operation: format!("deserialize weights '{name}' from in-memory storage"),
                message: e.to_string(),
            })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
