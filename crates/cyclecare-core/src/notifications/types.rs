//! Notification records, schedule state and reconciliation reports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::forecast::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Fires on the predicted day.
    DayOf,
    /// Fires ahead of the predicted day for irregular cycles.
    EarlyWarning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    /// Deterministic: `cycle-v{version}-{event}-{cycle_index}[-early]`.
    pub id: String,
    pub event_type: EventType,
    pub kind: NotificationKind,
    pub trigger_at: NaiveDateTime,
    /// Predicted date of the event this reminds about.
    pub event_date: NaiveDate,
    pub cycle_index: u32,
    pub cycle_profile_version: u64,
    pub payload: NotificationPayload,
}

/// Lifecycle of the schedule for one profile version.
///
/// ```text
/// Unscheduled -> Scheduled -> Reconciling -> Scheduled | Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    Unscheduled,
    Scheduled,
    /// A reconciliation started but did not finish.
    Reconciling,
    Cancelled,
}

/// What the backend is believed to hold, persisted for restart recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSchedule {
    pub version: u64,
    pub state: ScheduleState,
    pub notifications: Vec<ScheduledNotification>,
    /// Ids whose cancellation failed and must be retried. Entries ending in
    /// '-' are prefixes and are cancelled in bulk.
    #[serde(default)]
    pub stale_ids: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for AppliedSchedule {
    fn default() -> Self {
        Self::empty(0)
    }
}

impl AppliedSchedule {
    pub fn empty(version: u64) -> Self {
        Self {
            version,
            state: ScheduleState::Unscheduled,
            notifications: Vec::new(),
            stale_ids: Vec::new(),
            updated_at: None,
        }
    }

    pub fn ids(&self) -> BTreeSet<&str> {
        self.notifications.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notifications.iter().any(|n| n.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Schedule,
    Cancel,
    /// Bulk cancel; the failed `id` is the prefix.
    CancelAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedOperation {
    pub id: String,
    pub operation: Operation,
    pub error: String,
    /// The notification to re-add when retrying a failed schedule.
    #[serde(default)]
    pub notification: Option<ScheduledNotification>,
}

impl FailedOperation {
    pub fn schedule(notification: &ScheduledNotification, error: impl ToString) -> Self {
        Self {
            id: notification.id.clone(),
            operation: Operation::Schedule,
            error: error.to_string(),
            notification: Some(notification.clone()),
        }
    }

    pub fn cancel(id: &str, error: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            operation: Operation::Cancel,
            error: error.to_string(),
            notification: None,
        }
    }

    pub fn cancel_all(prefix: &str, error: impl ToString) -> Self {
        Self {
            id: prefix.to_string(),
            operation: Operation::CancelAll,
            error: error.to_string(),
            notification: None,
        }
    }
}

/// Aggregate outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub version: u64,
    pub scheduled: Vec<String>,
    pub cancelled: Vec<String>,
    pub failed: Vec<FailedOperation>,
    /// A newer profile version took over; remaining adds were skipped.
    pub superseded: bool,
    /// The cancellation token fired; remaining adds were skipped.
    pub aborted: bool,
    /// Persisting the applied schedule failed.
    pub storage_error: Option<String>,
}

impl ReconciliationReport {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Ids of every operation that went through.
    pub fn succeeded(&self) -> Vec<&str> {
        self.cancelled
            .iter()
            .chain(self.scheduled.iter())
            .map(String::as_str)
            .collect()
    }

    /// Nothing was scheduled, cancelled or attempted.
    pub fn is_noop(&self) -> bool {
        self.scheduled.is_empty() && self.cancelled.is_empty() && self.failed.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || self.storage_error.is_some()
    }

    /// Every operation ran and succeeded.
    pub fn is_complete(&self) -> bool {
        !self.superseded && !self.aborted && !self.has_failures()
    }

    pub fn message(&self) -> String {
        if self.superseded {
            return format!("Reconciliation for version {} was superseded.", self.version);
        }
        if self.is_noop() && !self.aborted {
            return "Notifications already up to date.".to_string();
        }
        let mut msg = format!(
            "Scheduled {}, cancelled {}, failed {}.",
            self.scheduled.len(),
            self.cancelled.len(),
            self.failed.len()
        );
        if self.aborted {
            msg.push_str(" Remaining adds were abandoned.");
        }
        if let Some(err) = &self.storage_error {
            msg.push_str(&format!(" Schedule not persisted: {err}."));
        }
        msg
    }
}
