//! In-memory key-value store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use super::{KvStore, StoreError};

/// In-memory implementation of [`KvStore`].
///
/// Suitable for tests, local runs and single-process deployments. Strings
/// and hashes sit behind reader-writer locks; lists behind a mutex so that
/// pops are mutually exclusive.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
    strings: RwLock<HashMap<String, String>>,
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let strings = self.strings.read().unwrap_or_else(PoisonError::into_inner);
        Ok(strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut strings = self.strings.write().unwrap_or_else(PoisonError::into_inner);
        strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let hashes = self.hashes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(hashes.get(key).and_then(|h| h.get(field).cloned()))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut hashes = self.hashes.write().unwrap_or_else(PoisonError::into_inner);
        hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_values(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let hashes = self.hashes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(hashes
            .get(key)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_push_back(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    async fn list_len(&self, key: &str) -> Result<usize, StoreError> {
        let lists = self.lists.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(lists.get(key).map_or(0, VecDeque::len))
    }
}
