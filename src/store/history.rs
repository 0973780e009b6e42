// src/store/history.rs

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::session::{LegacySession, Session};
use crate::store::{KeyValueStore, StoreError, read_json, write_json};

pub const LEGACY_SESSION_KEY: &str = "exam_session_v1";
pub const HISTORY_KEY: &str = "exam_sessions_v1";
pub const ACTIVE_SESSION_KEY: &str = "active_session_id_v1";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Bounded, most-recent-first list of sessions plus the active pointer.
pub struct SessionHistory {
    store: Arc<dyn KeyValueStore>,
    limit: usize,
    // Serialises read-modify-write cycles on the list.
    write_lock: Mutex<()>,
}

impl SessionHistory {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Loads the list, lifting a pre-history single-session record the
    /// first time. The legacy key itself is never touched.
    pub async fn load(&self) -> Result<Vec<Session>, StoreError> {
        if let Some(sessions) = read_json::<Vec<Session>>(self.store.as_ref(), HISTORY_KEY).await? {
            return Ok(sessions);
        }
        let _guard = self.write_lock.lock().await;
        self.load_locked().await
    }

    /// Caller holds `write_lock`.
    async fn load_locked(&self) -> Result<Vec<Session>, StoreError> {
        if let Some(sessions) = read_json::<Vec<Session>>(self.store.as_ref(), HISTORY_KEY).await? {
            return Ok(sessions);
        }
        let Some(legacy) = read_json::<LegacySession>(self.store.as_ref(), LEGACY_SESSION_KEY).await? else {
            return Ok(Vec::new());
        };

        let session = legacy.into_session();
        tracing::info!("Migrated legacy session for set {} into history", session.set_id);
        let sessions = vec![session];
        write_json(self.store.as_ref(), HISTORY_KEY, &sessions).await?;
        write_json(self.store.as_ref(), ACTIVE_SESSION_KEY, &sessions[0].id).await?;
        Ok(sessions)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.load().await?.into_iter().find(|s| s.id == id))
    }

    /// Upserts by id, keeps the most recently created `limit` records.
    pub async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.load_locked().await?;
        sessions.retain(|s| s.id != session.id);
        sessions.push(session.clone());
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(self.limit);
        write_json(self.store.as_ref(), HISTORY_KEY, &sessions).await
    }

    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.load_locked().await?;
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        let removed = sessions.len() != before;
        if removed {
            write_json(self.store.as_ref(), HISTORY_KEY, &sessions).await?;
        }
        if self.active_id().await?.as_deref() == Some(id) {
            self.store.remove(ACTIVE_SESSION_KEY).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(HISTORY_KEY).await?;
        self.store.remove(ACTIVE_SESSION_KEY).await
    }

    pub async fn active_id(&self) -> Result<Option<String>, StoreError> {
        read_json(self.store.as_ref(), ACTIVE_SESSION_KEY).await
    }

    pub async fn set_active(&self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            Some(id) => write_json(self.store.as_ref(), ACTIVE_SESSION_KEY, &id).await,
            None => self.store.remove(ACTIVE_SESSION_KEY).await,
        }
    }

    pub async fn active(&self) -> Result<Option<Session>, StoreError> {
        match self.active_id().await? {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }
}
