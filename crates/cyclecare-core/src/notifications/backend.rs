//! Notification backend seam.
//!
//! The host platform owns actual delivery. The engine only needs to add a
//! notification by id, cancel one by id, and bulk-cancel by id prefix.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::types::NotificationPayload;
use crate::error::BackendError;

#[async_trait]
pub trait NotificationBackend: Send + Sync {
    async fn schedule_notification(
        &self,
        id: &str,
        trigger_at: NaiveDateTime,
        payload: &NotificationPayload,
    ) -> Result<(), BackendError>;

    async fn cancel_notification(&self, id: &str) -> Result<(), BackendError>;

    /// Cancel every live notification whose id starts with `prefix`.
    async fn cancel_all(&self, prefix: &str) -> Result<(), BackendError>;
}

/// A notification as held by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveNotification {
    pub id: String,
    pub trigger_at: NaiveDateTime,
    pub payload: NotificationPayload,
}

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCalls {
    pub schedule: usize,
    pub cancel: usize,
    pub cancel_all: usize,
}

impl BackendCalls {
    pub fn total(&self) -> usize {
        self.schedule + self.cancel + self.cancel_all
    }
}

#[derive(Debug, Default)]
struct MemoryBackendState {
    live: BTreeMap<String, LiveNotification>,
    failing_ids: HashSet<String>,
    unavailable: bool,
    fail_cancel_all: bool,
    delay: Option<Duration>,
    calls: BackendCalls,
}

/// In-process backend with failure injection.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryBackendState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryBackendState) -> T) -> T {
        match self.state.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn live(&self) -> Vec<LiveNotification> {
        self.with_state(|s| s.live.values().cloned().collect())
    }

    pub fn live_ids(&self) -> Vec<String> {
        self.with_state(|s| s.live.keys().cloned().collect())
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.with_state(|s| s.live.contains_key(id))
    }

    /// Make every operation on `id` fail.
    pub fn fail_id(&self, id: &str) {
        self.with_state(|s| {
            s.failing_ids.insert(id.to_string());
        });
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.with_state(|s| s.unavailable = unavailable);
    }

    pub fn set_fail_cancel_all(&self, fail: bool) {
        self.with_state(|s| s.fail_cancel_all = fail);
    }

    /// Delay each schedule call, to hold a reconciliation in flight.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.delay = delay);
    }

    pub fn clear_failures(&self) {
        self.with_state(|s| {
            s.failing_ids.clear();
            s.unavailable = false;
            s.fail_cancel_all = false;
        });
    }

    pub fn calls(&self) -> BackendCalls {
        self.with_state(|s| s.calls)
    }

    pub fn reset_calls(&self) {
        self.with_state(|s| s.calls = BackendCalls::default());
    }

    fn check(state: &MemoryBackendState, id: &str) -> Result<(), BackendError> {
        if state.unavailable {
            return Err(BackendError::Unreachable("backend offline".to_string()));
        }
        if state.failing_ids.contains(id) {
            return Err(BackendError::Rejected {
                id: id.to_string(),
                message: "failure injected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationBackend for MemoryBackend {
    async fn schedule_notification(
        &self,
        id: &str,
        trigger_at: NaiveDateTime,
        payload: &NotificationPayload,
    ) -> Result<(), BackendError> {
        if let Some(delay) = self.with_state(|s| s.delay) {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            s.calls.schedule += 1;
            Self::check(s, id)?;
            s.live.insert(
                id.to_string(),
                LiveNotification {
                    id: id.to_string(),
                    trigger_at,
                    payload: payload.clone(),
                },
            );
            Ok(())
        })
    }

    async fn cancel_notification(&self, id: &str) -> Result<(), BackendError> {
        self.with_state(|s| {
            s.calls.cancel += 1;
            Self::check(s, id)?;
            s.live.remove(id);
            Ok(())
        })
    }

    async fn cancel_all(&self, prefix: &str) -> Result<(), BackendError> {
        self.with_state(|s| {
            s.calls.cancel_all += 1;
            if s.unavailable || s.fail_cancel_all {
                return Err(BackendError::Unreachable("bulk cancel failed".to_string()));
            }
            s.live.retain(|id, _| !id.starts_with(prefix));
            Ok(())
        })
    }
}
