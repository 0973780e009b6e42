// src/store/review.rs

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use crate::models::review::ReviewMap;
use crate::store::{KeyValueStore, StoreError, read_json, write_json};

pub const REVIEW_KEY: &str = "exam_spaced_repetition_v1";

/// Global spaced-repetition map. Every write is announced on a broadcast
/// channel carrying the new entry count.
pub struct ReviewRepository {
    store: Arc<dyn KeyValueStore>,
    changes: broadcast::Sender<usize>,
    write_lock: Mutex<()>,
}

impl ReviewRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            store,
            changes,
            write_lock: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<usize> {
        self.changes.subscribe()
    }

    pub async fn load(&self) -> Result<ReviewMap, StoreError> {
        Ok(read_json(self.store.as_ref(), REVIEW_KEY).await?.unwrap_or_default())
    }

    /// Read-modify-write under one lock; the closure sees the current map.
    pub async fn update<F, T>(&self, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut ReviewMap) -> T + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        let result = apply(&mut map);
        write_json(self.store.as_ref(), REVIEW_KEY, &map).await?;
        // No subscribers is fine.
        let _ = self.changes.send(map.len());
        Ok(result)
    }
}
