// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{KeyValueStore, StoreError};

/// In-process store, used by tests and as a scratch backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.records.lock().await.remove(key);
        Ok(())
    }
}

/// Yields to the scheduler before every operation so that concurrent callers
/// interleave at each storage await point.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct YieldingStore {
    inner: MemoryStore,
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for YieldingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        tokio::task::yield_now().await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.remove(key).await
    }
}
