//! File-backed notification backend.
//!
//! Used by the CLI, where there is no platform notification center. Live
//! notifications are kept in a JSON file keyed by id; a host process can
//! read it and deliver whatever is due.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::backend::{LiveNotification, NotificationBackend};
use super::types::NotificationPayload;
use crate::error::BackendError;
use crate::storage::data_dir;

const OUTBOX_FILE: &str = "notifications.json";

pub struct OutboxBackend {
    path: PathBuf,
    live: Mutex<BTreeMap<String, LiveNotification>>,
}

impl OutboxBackend {
    /// Open the outbox at `path`, loading whatever it already holds.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let live = Self::read(&path)?;
        Ok(Self {
            path,
            live: Mutex::new(live),
        })
    }

    /// Open `notifications.json` in the data directory.
    pub fn open_default() -> Result<Self, BackendError> {
        let dir = data_dir().map_err(|e| BackendError::Unreachable(e.to_string()))?;
        Self::open(dir.join(OUTBOX_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Live notifications ordered by trigger time.
    pub fn live(&self) -> Vec<LiveNotification> {
        let mut live: Vec<_> = match self.live.lock() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        };
        live.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at).then_with(|| a.id.cmp(&b.id)));
        live
    }

    fn read(path: &Path) -> Result<BTreeMap<String, LiveNotification>, BackendError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| BackendError::Unreachable(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            BackendError::Unreachable(format!("corrupt outbox {}: {e}", path.display()))
        })
    }

    fn persist(&self, live: &BTreeMap<String, LiveNotification>) -> Result<(), BackendError> {
        let data = serde_json::to_string_pretty(live)
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        std::fs::write(&self.path, data).map_err(|e| BackendError::Unreachable(e.to_string()))
    }

    /// Apply `change` and write the result; on write failure the in-memory
    /// copy is left as it was.
    fn mutate(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, LiveNotification>),
    ) -> Result<(), BackendError> {
        let mut guard = self
            .live
            .lock()
            .map_err(|_| BackendError::Unreachable("outbox lock poisoned".to_string()))?;
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl NotificationBackend for OutboxBackend {
    async fn schedule_notification(
        &self,
        id: &str,
        trigger_at: NaiveDateTime,
        payload: &NotificationPayload,
    ) -> Result<(), BackendError> {
        self.mutate(|live| {
            live.insert(
                id.to_string(),
                LiveNotification {
                    id: id.to_string(),
                    trigger_at,
                    payload: payload.clone(),
                },
            );
        })
    }

    async fn cancel_notification(&self, id: &str) -> Result<(), BackendError> {
        self.mutate(|live| {
            live.remove(id);
        })
    }

    async fn cancel_all(&self, prefix: &str) -> Result<(), BackendError> {
        self.mutate(|live| live.retain(|id, _| !id.starts_with(prefix)))
    }
}
