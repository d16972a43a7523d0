//! Reconciles the backend's live notifications with a desired set.
//!
//! One reconciliation runs at a time. Each pass cancels what should no longer
//! be live before adding what should, so a superseded version never has
//! notifications left behind. A newer profile version wins over an older one
//! still in flight: the older pass stops adding as soon as it notices.
//!
//! The applied schedule is persisted after the cancel phase and again at the
//! end. If persistence fails the scheduler keeps going on its in-memory copy.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::backend::NotificationBackend;
use super::plan::{version_prefix, ID_ROOT};
use super::types::{
    AppliedSchedule, FailedOperation, Operation, ReconciliationReport, ScheduleState,
    ScheduledNotification,
};
use crate::error::{CoreError, Result};
use crate::storage::kv::{get_json, set_json};
use crate::storage::{KeyValueStore, SCHEDULE_KEY};

pub struct NotificationScheduler {
    backend: Arc<dyn NotificationBackend>,
    store: Arc<dyn KeyValueStore>,
    latest_version: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
    apply_lock: tokio::sync::Mutex<()>,
    last_applied: Mutex<Option<AppliedSchedule>>,
}

/// What the backend is believed to hold before a pass starts.
enum Baseline {
    Known(AppliedSchedule),
    /// Nothing could be read; the backend may hold anything under [`ID_ROOT`].
    Unknown,
}

impl NotificationScheduler {
    pub fn new(backend: Arc<dyn NotificationBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            store,
            latest_version: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            apply_lock: tokio::sync::Mutex::new(()),
            last_applied: Mutex::new(None),
        }
    }

    /// Highest profile version this scheduler has been asked to apply.
    pub fn latest_version(&self) -> u64 {
        self.latest_version.load(Ordering::SeqCst)
    }

    fn is_superseded(&self, version: u64) -> bool {
        self.latest_version() > version
    }

    /// Register `version` as the newest request and cancel whatever pass was
    /// in flight.
    pub fn begin(&self, version: u64) -> CancellationToken {
        self.latest_version.fetch_max(version, Ordering::SeqCst);
        let token = CancellationToken::new();
        let previous = match self.in_flight.lock() {
            Ok(mut slot) => slot.replace(token.clone()),
            Err(poisoned) => poisoned.into_inner().replace(token.clone()),
        };
        if let Some(previous) = previous {
            previous.cancel();
        }
        token
    }

    /// Abandon the remaining adds of the pass in flight, if any.
    pub fn cancel_in_flight(&self) {
        let token = match self.in_flight.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = token {
            token.cancel();
        }
    }

    fn cached(&self) -> Option<AppliedSchedule> {
        match self.last_applied.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn remember(&self, applied: &AppliedSchedule) {
        match self.last_applied.lock() {
            Ok(mut guard) => *guard = Some(applied.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(applied.clone()),
        }
    }

    async fn baseline(&self) -> Baseline {
        if let Some(applied) = self.cached() {
            return Baseline::Known(applied);
        }
        match get_json::<AppliedSchedule>(self.store.as_ref(), SCHEDULE_KEY).await {
            Ok(Some(applied)) => Baseline::Known(applied),
            Ok(None) => Baseline::Known(AppliedSchedule::default()),
            Err(e) => {
                tracing::warn!(error = %e, "applied schedule unreadable");
                Baseline::Unknown
            }
        }
    }

    /// The schedule the backend is believed to hold, if known.
    pub async fn applied(&self) -> Option<AppliedSchedule> {
        match self.baseline().await {
            Baseline::Known(applied) => Some(applied),
            Baseline::Unknown => None,
        }
    }

    /// Whether `version` is not yet fully applied.
    pub async fn needs_reconciliation(&self, version: u64) -> bool {
        match self.baseline().await {
            Baseline::Known(applied) => {
                applied.version != version
                    || applied.state != ScheduleState::Scheduled
                    || !applied.stale_ids.is_empty()
            }
            Baseline::Unknown => true,
        }
    }

    /// Persist and cache `applied`. Returns the storage error message, if any.
    async fn commit(&self, applied: &AppliedSchedule) -> Option<String> {
        self.remember(applied);
        match set_json(self.store.as_ref(), SCHEDULE_KEY, applied).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, version = applied.version, "applied schedule not persisted");
                Some(e.to_string())
            }
        }
    }

    /// Make the backend hold exactly `desired` for `version`.
    ///
    /// Every entry must belong to `version`. Supersedes any pass in flight.
    pub async fn reconcile(
        &self,
        version: u64,
        desired: Vec<ScheduledNotification>,
    ) -> Result<ReconciliationReport> {
        let prefix = version_prefix(version);
        if let Some(stray) = desired
            .iter()
            .find(|n| n.cycle_profile_version != version || !n.id.starts_with(&prefix))
        {
            return Err(CoreError::invalid_argument(
                "desired",
                format!("notification '{}' does not belong to version {version}", stray.id),
            ));
        }
        let token = self.begin(version);
        self.reconcile_with_token(version, desired, token).await
    }

    /// Like [`reconcile`](Self::reconcile), stopping early once `token` fires.
    pub async fn reconcile_with_token(
        &self,
        version: u64,
        desired: Vec<ScheduledNotification>,
        token: CancellationToken,
    ) -> Result<ReconciliationReport> {
        self.latest_version.fetch_max(version, Ordering::SeqCst);
        let _guard = self.apply_lock.lock().await;
        let mut report = ReconciliationReport::new(version);

        if self.is_superseded(version) {
            report.superseded = true;
            return Ok(report);
        }
        if token.is_cancelled() {
            report.aborted = true;
            return Ok(report);
        }

        let mut stale: Vec<String> = Vec::new();
        let mut previous = match self.baseline().await {
            Baseline::Known(applied) => applied,
            Baseline::Unknown => {
                // Start from a clean slate; adds are idempotent by id.
                match self.backend.cancel_all(ID_ROOT).await {
                    Ok(()) => tracing::info!("cleared all cycle notifications"),
                    Err(e) => {
                        report.failed.push(FailedOperation::cancel_all(ID_ROOT, &e));
                        stale.push(ID_ROOT.to_string());
                    }
                }
                AppliedSchedule::empty(0)
            }
        };

        if previous.version > version {
            self.latest_version.fetch_max(previous.version, Ordering::SeqCst);
            report.superseded = true;
            return Ok(report);
        }

        if previous.version == version
            && previous.state == ScheduleState::Scheduled
            && previous.stale_ids.is_empty()
            && previous.notifications == desired
        {
            tracing::debug!(version, "notifications already up to date");
            return Ok(report);
        }

        let desired_ids: BTreeMap<&str, &ScheduledNotification> =
            desired.iter().map(|n| (n.id.as_str(), n)).collect();

        // Cancels left over from earlier passes.
        let mut cleared_root = false;
        for id in &previous.stale_ids {
            if is_prefix(id) {
                match self.backend.cancel_all(id).await {
                    Ok(()) => {
                        report.cancelled.push(id.clone());
                        cleared_root |= id == ID_ROOT;
                    }
                    Err(e) => {
                        report.failed.push(FailedOperation::cancel_all(id, &e));
                        stale.push(id.clone());
                    }
                }
                continue;
            }
            if desired_ids.contains_key(id.as_str()) {
                continue;
            }
            match self.backend.cancel_notification(id).await {
                Ok(()) => report.cancelled.push(id.clone()),
                Err(e) => {
                    report.failed.push(FailedOperation::cancel(id, &e));
                    stale.push(id.clone());
                }
            }
        }

        if cleared_root {
            // The backend holds nothing of ours any more.
            previous.notifications.clear();
            previous.state = ScheduleState::Cancelled;
        }

        let mut kept: Vec<ScheduledNotification> = Vec::new();
        if previous.version != version {
            if !previous.notifications.is_empty() || previous.state == ScheduleState::Reconciling {
                self.cancel_version(&previous, &mut report, &mut stale).await;
            }
        } else {
            for n in &previous.notifications {
                match desired_ids.get(n.id.as_str()) {
                    Some(wanted) if previous.state == ScheduleState::Scheduled && *wanted == n => {
                        kept.push(n.clone());
                    }
                    Some(_) => {}
                    None => match self.backend.cancel_notification(&n.id).await {
                        Ok(()) => report.cancelled.push(n.id.clone()),
                        Err(e) => {
                            report.failed.push(FailedOperation::cancel(&n.id, &e));
                            stale.push(n.id.clone());
                        }
                    },
                }
            }
        }

        let to_add: Vec<&ScheduledNotification> = desired
            .iter()
            .filter(|n| !kept.iter().any(|k| k.id == n.id))
            .collect();

        let mut pending = AppliedSchedule {
            version,
            state: ScheduleState::Reconciling,
            notifications: kept.iter().cloned().chain(to_add.iter().map(|n| (*n).clone())).collect(),
            stale_ids: stale.clone(),
            updated_at: Some(Utc::now()),
        };
        if let Some(err) = self.commit(&pending).await {
            report.storage_error = Some(err);
        }

        let mut confirmed = kept;
        for n in to_add {
            if self.is_superseded(version) {
                report.superseded = true;
                break;
            }
            if token.is_cancelled() {
                report.aborted = true;
                break;
            }
            match self
                .backend
                .schedule_notification(&n.id, n.trigger_at, &n.payload)
                .await
            {
                Ok(()) => {
                    report.scheduled.push(n.id.clone());
                    confirmed.push(n.clone());
                }
                Err(e) => report.failed.push(FailedOperation::schedule(n, &e)),
            }
        }
        confirmed.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at).then_with(|| a.id.cmp(&b.id)));

        pending.state = if report.superseded || report.aborted {
            ScheduleState::Reconciling
        } else {
            ScheduleState::Scheduled
        };
        pending.notifications = confirmed;
        pending.updated_at = Some(Utc::now());
        if let Some(err) = self.commit(&pending).await {
            report.storage_error = Some(err);
        }

        if report.has_failures() {
            tracing::warn!(
                version,
                scheduled = report.scheduled.len(),
                cancelled = report.cancelled.len(),
                failed = report.failed.len(),
                "reconciliation finished with failures"
            );
        } else {
            tracing::info!(
                version,
                scheduled = report.scheduled.len(),
                cancelled = report.cancelled.len(),
                superseded = report.superseded,
                aborted = report.aborted,
                "reconciliation finished"
            );
        }
        Ok(report)
    }

    /// Cancel everything belonging to `previous`, by prefix first and one by
    /// one if the bulk cancel fails.
    async fn cancel_version(
        &self,
        previous: &AppliedSchedule,
        report: &mut ReconciliationReport,
        stale: &mut Vec<String>,
    ) {
        let prefix = version_prefix(previous.version);
        let bulk_error = match self.backend.cancel_all(&prefix).await {
            Ok(()) => {
                report
                    .cancelled
                    .extend(previous.notifications.iter().map(|n| n.id.clone()));
                return;
            }
            Err(e) => e,
        };
        tracing::warn!(error = %bulk_error, prefix, "bulk cancel failed, cancelling one by one");
        for n in &previous.notifications {
            match self.backend.cancel_notification(&n.id).await {
                Ok(()) => report.cancelled.push(n.id.clone()),
                Err(e) => {
                    report.failed.push(FailedOperation::cancel(&n.id, &e));
                    stale.push(n.id.clone());
                }
            }
        }
        // An interrupted pass may have added ids it never recorded; only the
        // prefix reaches those.
        if previous.state == ScheduleState::Reconciling {
            report.failed.push(FailedOperation::cancel_all(&prefix, &bulk_error));
            stale.push(prefix);
        }
    }

    /// Re-run the failed operations of `report`.
    ///
    /// Failed adds are retried only while their version is still current.
    pub async fn retry_failed(&self, report: &ReconciliationReport) -> Result<ReconciliationReport> {
        let _guard = self.apply_lock.lock().await;
        let mut retry = ReconciliationReport::new(report.version);
        if self.is_superseded(report.version) {
            retry.superseded = true;
            return Ok(retry);
        }

        let mut applied = match self.baseline().await {
            Baseline::Known(applied) => applied,
            Baseline::Unknown => AppliedSchedule::empty(report.version),
        };

        for failed in &report.failed {
            match failed.operation {
                Operation::Schedule => {
                    let Some(n) = &failed.notification else {
                        continue;
                    };
                    if n.cycle_profile_version != applied.version {
                        continue;
                    }
                    match self
                        .backend
                        .schedule_notification(&n.id, n.trigger_at, &n.payload)
                        .await
                    {
                        Ok(()) => {
                            retry.scheduled.push(n.id.clone());
                            applied.notifications.retain(|existing| existing.id != n.id);
                            applied.notifications.push(n.clone());
                        }
                        Err(e) => retry.failed.push(FailedOperation::schedule(n, &e)),
                    }
                }
                Operation::Cancel => match self.backend.cancel_notification(&failed.id).await {
                    Ok(()) => {
                        retry.cancelled.push(failed.id.clone());
                        applied.stale_ids.retain(|id| id != &failed.id);
                    }
                    Err(e) => retry.failed.push(FailedOperation::cancel(&failed.id, &e)),
                },
                Operation::CancelAll => match self.backend.cancel_all(&failed.id).await {
                    Ok(()) => {
                        retry.cancelled.push(failed.id.clone());
                        applied.stale_ids.retain(|id| !id.starts_with(&failed.id));
                        if version_prefix(applied.version).starts_with(&failed.id) {
                            // The prefix also covered the current version.
                            self.restore(&mut applied, &mut retry).await;
                        }
                    }
                    Err(e) => retry.failed.push(FailedOperation::cancel_all(&failed.id, &e)),
                },
            }
        }

        applied
            .notifications
            .sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at).then_with(|| a.id.cmp(&b.id)));
        applied.updated_at = Some(Utc::now());
        retry.storage_error = self.commit(&applied).await;
        tracing::info!(
            version = report.version,
            recovered = retry.succeeded().len(),
            still_failing = retry.failed.len(),
            "retried failed operations"
        );
        Ok(retry)
    }

    /// Re-add every notification of `applied` after a prefix cancel took
    /// them down. Those that fail are dropped from `applied`.
    async fn restore(&self, applied: &mut AppliedSchedule, retry: &mut ReconciliationReport) {
        let mut restored = Vec::with_capacity(applied.notifications.len());
        for n in applied.notifications.drain(..) {
            match self
                .backend
                .schedule_notification(&n.id, n.trigger_at, &n.payload)
                .await
            {
                Ok(()) => restored.push(n),
                Err(e) => retry.failed.push(FailedOperation::schedule(&n, &e)),
            }
        }
        applied.notifications = restored;
    }

    /// Cancel every notification this engine created.
    pub async fn cancel_all(&self) -> Result<ReconciliationReport> {
        self.cancel_in_flight();
        let _guard = self.apply_lock.lock().await;

        let previous = self.applied().await.unwrap_or_default();
        self.backend.cancel_all(ID_ROOT).await?;

        let mut report = ReconciliationReport::new(previous.version);
        report.cancelled = previous.ids().into_iter().map(String::from).collect();
        let cleared = AppliedSchedule {
            version: previous.version,
            state: ScheduleState::Cancelled,
            notifications: Vec::new(),
            stale_ids: Vec::new(),
            updated_at: Some(Utc::now()),
        };
        report.storage_error = self.commit(&cleared).await;
        tracing::info!(cancelled = report.cancelled.len(), "all notifications cancelled");
        Ok(report)
    }
}

/// Notification ids never end in '-'; stale prefixes always do.
fn is_prefix(entry: &str) -> bool {
    entry.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::CycleProfile;
    use crate::forecast::forecast;
    use crate::notifications::backend::MemoryBackend;
    use crate::notifications::plan::desired_notifications;
    use crate::storage::{MemoryStore, RemindersConfig};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn desired(profile: &CycleProfile) -> Vec<ScheduledNotification> {
        let events = forecast(profile, date(2025, 1, 1), 3).unwrap();
        desired_notifications(
            profile,
            events,
            &RemindersConfig::default(),
            date(2025, 1, 1),
            |_| true,
        )
    }

    fn setup() -> (Arc<MemoryBackend>, Arc<MemoryStore>, NotificationScheduler) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(MemoryStore::new());
        let scheduler = NotificationScheduler::new(backend.clone(), store.clone());
        (backend, store, scheduler)
    }

    #[tokio::test]
    async fn first_pass_schedules_everything() {
        let (backend, _, scheduler) = setup();
        let profile = CycleProfile::new(date(2025, 1, 1));
        let report = scheduler.reconcile(1, desired(&profile)).await.unwrap();

        assert_eq!(report.scheduled.len(), 12);
        assert!(report.is_complete());
        assert_eq!(backend.live_ids().len(), 12);
        assert!(!scheduler.needs_reconciliation(1).await);
    }

    #[tokio::test]
    async fn second_identical_pass_is_noop() {
        let (backend, _, scheduler) = setup();
        let profile = CycleProfile::new(date(2025, 1, 1));
        scheduler.reconcile(1, desired(&profile)).await.unwrap();
        backend.reset_calls();

        let report = scheduler.reconcile(1, desired(&profile)).await.unwrap();
        assert!(report.is_noop());
        assert_eq!(backend.calls().total(), 0);
    }

    #[tokio::test]
    async fn mismatched_version_is_rejected() {
        let (_, _, scheduler) = setup();
        let profile = CycleProfile::new(date(2025, 1, 1));
        let result = scheduler.reconcile(2, desired(&profile)).await;
        assert!(matches!(result, Err(CoreError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn older_version_after_newer_is_superseded() {
        let (backend, _, scheduler) = setup();
        let v1 = CycleProfile::new(date(2025, 1, 1));
        let v2 = v1.clone().with_cycle_length(30);
        scheduler.reconcile(2, desired(&CycleProfile { version: 2, ..v2 })).await.unwrap();

        let report = scheduler.reconcile(1, desired(&v1)).await.unwrap();
        assert!(report.superseded);
        assert!(backend.live_ids().iter().all(|id| id.starts_with("cycle-v2-")));
    }

    #[tokio::test]
    async fn cancel_all_clears_backend_and_marks_cancelled() {
        let (backend, _, scheduler) = setup();
        let profile = CycleProfile::new(date(2025, 1, 1));
        scheduler.reconcile(1, desired(&profile)).await.unwrap();

        let report = scheduler.cancel_all().await.unwrap();
        assert_eq!(report.cancelled.len(), 12);
        assert!(backend.live_ids().is_empty());
        let applied = scheduler.applied().await.unwrap();
        assert_eq!(applied.state, ScheduleState::Cancelled);
        assert!(scheduler.needs_reconciliation(1).await);
    }

    #[tokio::test]
    async fn unreadable_baseline_clears_everything_first() {
        let (backend, store, scheduler) = setup();
        let profile = CycleProfile::new(date(2025, 1, 1));
        let orphan = desired(&profile).remove(0);
        backend
            .schedule_notification("cycle-v0-orphan-0", orphan.trigger_at, &orphan.payload)
            .await
            .unwrap();
        store.set_fail_reads(true);

        let report = scheduler.reconcile(1, desired(&profile)).await.unwrap();
        assert_eq!(report.scheduled.len(), 12);
        assert!(!backend.is_live("cycle-v0-orphan-0"));
        assert_eq!(backend.calls().cancel_all, 1);
    }
}
