// src/store/auxiliary.rs

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::mistake::{MistakeMap, MistakeReason, SelfMarkMap};
use crate::store::{KeyValueStore, StoreError, read_json, write_json};

pub const MISTAKES_KEY: &str = "exam_mistakes_v1";
pub const SELF_MARKS_KEY: &str = "exam_self_marks_v1";

pub struct MistakeRepository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl MistakeRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<MistakeMap, StoreError> {
        Ok(read_json(self.store.as_ref(), MISTAKES_KEY).await?.unwrap_or_default())
    }

    pub async fn get(&self, question_id: &str) -> Result<Option<MistakeReason>, StoreError> {
        Ok(self.load().await?.get(question_id).copied())
    }

    /// `None` clears the entry.
    pub async fn set(&self, question_id: &str, reason: Option<MistakeReason>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        match reason {
            Some(reason) => {
                map.insert(question_id.to_string(), reason);
            }
            None => {
                map.remove(question_id);
            }
        }
        write_json(self.store.as_ref(), MISTAKES_KEY, &map).await
    }
}

pub struct SelfMarkRepository {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl SelfMarkRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<SelfMarkMap, StoreError> {
        Ok(read_json(self.store.as_ref(), SELF_MARKS_KEY).await?.unwrap_or_default())
    }

    pub async fn for_session(&self, session_id: &str) -> Result<std::collections::BTreeMap<String, f64>, StoreError> {
        Ok(self.load().await?.remove(session_id).unwrap_or_default())
    }

    pub async fn set(&self, session_id: &str, key: &str, points: f64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), points);
        write_json(self.store.as_ref(), SELF_MARKS_KEY, &map).await
    }

    /// Drops marks of a discarded session.
    pub async fn remove_session(&self, session_id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(session_id).is_some() {
            write_json(self.store.as_ref(), SELF_MARKS_KEY, &map).await?;
        }
        Ok(())
    }
}
