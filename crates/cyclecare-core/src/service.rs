//! `CycleCare`: the engine wired together.
//!
//! Owns the config-derived cycle model, the feature gate, the subscription
//! store and the notification scheduler. Store and backend are injected so
//! the same engine runs against SQLite and the outbox file in the CLI and
//! against in-memory fakes in tests.

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::Arc;

use crate::cycle::{CycleDay, CycleModel, CyclePhase, CycleProfile, ProfileUpdate};
use crate::error::Result;
use crate::forecast::Forecast;
use crate::notifications::{
    desired_notifications, NotificationBackend, NotificationScheduler, ReconciliationReport,
    ScheduledNotification,
};
use crate::storage::kv::{get_json, set_json};
use crate::storage::{Config, KeyValueStore, PROFILE_KEY};
use crate::subscription::{FeatureGate, SubscriptionStatus, SubscriptionStore, Tier};

pub struct CycleCare {
    config: Config,
    model: CycleModel,
    gate: FeatureGate,
    store: Arc<dyn KeyValueStore>,
    subscriptions: SubscriptionStore,
    scheduler: NotificationScheduler,
}

impl CycleCare {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
    ) -> Self {
        Self {
            model: CycleModel::new(config.cycle.constants()),
            gate: FeatureGate::default(),
            subscriptions: SubscriptionStore::new(store.clone()),
            scheduler: NotificationScheduler::new(backend, store.clone()),
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn model(&self) -> &CycleModel {
        &self.model
    }

    pub fn gate(&self) -> &FeatureGate {
        &self.gate
    }

    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    // ── Cycle queries ──────────────────────────────────────────────────

    pub fn get_current_phase(
        &self,
        profile: &CycleProfile,
        date: NaiveDate,
    ) -> Result<(CycleDay, CyclePhase)> {
        self.model.phase_at(profile, date)
    }

    pub fn get_upcoming_events(
        &self,
        profile: &CycleProfile,
        from_date: NaiveDate,
        cycle_count: u32,
    ) -> Result<Forecast> {
        self.model.forecast(profile, from_date, cycle_count)
    }

    // ── Profile ────────────────────────────────────────────────────────

    pub async fn load_profile(&self) -> Result<Option<CycleProfile>> {
        Ok(get_json(self.store.as_ref(), PROFILE_KEY).await?)
    }

    pub async fn save_profile(&self, profile: &CycleProfile) -> Result<()> {
        profile.validate()?;
        set_json(self.store.as_ref(), PROFILE_KEY, profile).await?;
        Ok(())
    }

    /// Replace the stored profile. The new profile always gets a version
    /// above the stored and the applied one, so its notifications never
    /// reuse old ids.
    pub async fn set_profile(&self, mut profile: CycleProfile) -> Result<CycleProfile> {
        profile.validate()?;
        let applied = self.scheduler.applied().await.map_or(0, |a| a.version);
        let mut floor = self.scheduler.latest_version().max(applied);
        match self.load_profile().await {
            Ok(Some(existing)) => floor = floor.max(existing.version),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "stored profile unreadable, replacing it"),
        }
        if profile.version <= floor {
            profile.version = floor + 1;
        }
        self.save_profile(&profile).await?;
        tracing::info!(version = profile.version, "profile saved");
        Ok(profile)
    }

    /// Apply `update`, persist the result and reconcile its notifications.
    ///
    /// An empty update changes nothing and schedules nothing.
    pub async fn update_profile(
        &self,
        current: &CycleProfile,
        update: &ProfileUpdate,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(CycleProfile, Option<ReconciliationReport>)> {
        let next = current.update(update)?;
        if next.version == current.version {
            return Ok((next, None));
        }
        self.save_profile(&next).await?;
        tracing::info!(from = current.version, to = next.version, "profile updated");
        let report = self.reconcile_notifications_at(&next, today, now).await?;
        Ok((next, Some(report)))
    }

    // ── Notifications ──────────────────────────────────────────────────

    /// Notifications that should be live for `profile`, gated by the
    /// subscription status as of `now`.
    pub async fn plan_notifications(
        &self,
        profile: &CycleProfile,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduledNotification>> {
        let events = self
            .model
            .forecast(profile, today, self.config.reminders.forecast_cycles)?;
        let status = self.subscriptions.load().await;
        Ok(desired_notifications(
            profile,
            events,
            &self.config.reminders,
            today,
            |feature| self.gate.has_access(&status, feature, now),
        ))
    }

    pub async fn reconcile_notifications_at(
        &self,
        profile: &CycleProfile,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationReport> {
        profile.validate()?;
        let desired = self.plan_notifications(profile, today, now).await?;
        self.scheduler.reconcile(profile.version, desired).await
    }

    /// Reconcile against the local calendar date.
    pub async fn reconcile_notifications(
        &self,
        profile: &CycleProfile,
    ) -> Result<ReconciliationReport> {
        self.reconcile_notifications_at(profile, Local::now().date_naive(), Utc::now())
            .await
    }

    /// Re-run reconciliation after a restart if the applied schedule does not
    /// match `profile`. Returns `None` when nothing needed doing.
    pub async fn recover_on_start(
        &self,
        profile: &CycleProfile,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<ReconciliationReport>> {
        profile.validate()?;
        if !self.scheduler.needs_reconciliation(profile.version).await {
            tracing::debug!(version = profile.version, "applied schedule is current");
            return Ok(None);
        }
        tracing::info!(version = profile.version, "recovering notification schedule");
        self.reconcile_notifications_at(profile, today, now)
            .await
            .map(Some)
    }

    // ── Subscription ───────────────────────────────────────────────────

    pub async fn has_feature_access_at(&self, feature_id: &str, now: DateTime<Utc>) -> bool {
        let status = self.subscriptions.load().await;
        self.gate.has_access(&status, feature_id, now)
    }

    pub async fn has_feature_access(&self, feature_id: &str) -> bool {
        self.has_feature_access_at(feature_id, Utc::now()).await
    }

    pub async fn subscribe(
        &self,
        tier: Tier,
        months: u32,
        auto_renew: bool,
        payment_method: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionStatus> {
        self.subscriptions
            .subscribe(tier, months, auto_renew, payment_method, now)
            .await
    }

    pub async fn cancel_subscription(&self, now: DateTime<Utc>) -> Result<SubscriptionStatus> {
        self.subscriptions.cancel(now).await
    }

    pub async fn normalize_subscription(&self, now: DateTime<Utc>) -> Result<bool> {
        self.subscriptions.normalize_expired(now).await
    }
}
