//! Subscription state store.
//!
//! Wraps the key-value store with a last-known in-memory copy. Reads that
//! fail fall back to that copy; writes that fail are returned to the caller
//! and leave the copy untouched.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use super::status::SubscriptionStatus;
use super::tier::Tier;
use crate::error::{CoreError, Result};
use crate::storage::kv::{get_json, set_json};
use crate::storage::{KeyValueStore, SUBSCRIPTION_KEY};

pub struct SubscriptionStore {
    store: Arc<dyn KeyValueStore>,
    cached: RwLock<SubscriptionStatus>,
}

impl SubscriptionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(SubscriptionStatus::free()),
        }
    }

    /// Last known status without touching storage.
    pub fn current(&self) -> SubscriptionStatus {
        match self.cached.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn remember(&self, status: &SubscriptionStatus) {
        match self.cached.write() {
            Ok(mut guard) => *guard = status.clone(),
            Err(poisoned) => *poisoned.into_inner() = status.clone(),
        }
    }

    /// Read the persisted status, falling back to the last known one.
    pub async fn load(&self) -> SubscriptionStatus {
        match get_json::<SubscriptionStatus>(self.store.as_ref(), SUBSCRIPTION_KEY).await {
            Ok(Some(status)) => {
                self.remember(&status);
                status
            }
            Ok(None) => self.current(),
            Err(e) => {
                tracing::warn!(error = %e, "subscription read failed, using last known status");
                self.current()
            }
        }
    }

    pub async fn save(&self, status: &SubscriptionStatus) -> Result<()> {
        set_json(self.store.as_ref(), SUBSCRIPTION_KEY, status).await?;
        self.remember(status);
        Ok(())
    }

    /// Record a subscription to `tier` for `months` months starting `now`.
    ///
    /// Subscribing to `Free` is a downgrade and clears billing details.
    pub async fn subscribe(
        &self,
        tier: Tier,
        months: u32,
        auto_renew: bool,
        payment_method: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionStatus> {
        let status = if tier.is_paid() {
            if months == 0 {
                return Err(CoreError::invalid_argument("months", "must be at least 1"));
            }
            SubscriptionStatus::paid(tier, now, months, auto_renew, payment_method)
        } else {
            SubscriptionStatus::free()
        };
        self.save(&status).await?;
        tracing::info!(tier = %status.tier, end_date = ?status.end_date, "subscription recorded");
        Ok(status)
    }

    /// Stop renewal. Paid access runs until `end_date`; without a future
    /// end date the status reverts to Free immediately.
    pub async fn cancel(&self, now: DateTime<Utc>) -> Result<SubscriptionStatus> {
        let mut status = self.load().await;
        status.auto_renew = false;
        let runs_on = matches!(status.end_date, Some(end) if end >= now);
        if !runs_on {
            status = SubscriptionStatus::free();
        }
        self.save(&status).await?;
        tracing::info!(tier = %status.tier, "subscription cancelled");
        Ok(status)
    }

    /// Rewrite a lapsed paid status to Free. Returns whether anything changed.
    pub async fn normalize_expired(&self, now: DateTime<Utc>) -> Result<bool> {
        let status = self.load().await;
        if !status.needs_normalization(now) {
            return Ok(false);
        }
        let normalized = SubscriptionStatus {
            tier: Tier::Free,
            is_active: true,
            start_date: status.start_date,
            end_date: None,
            auto_renew: false,
            payment_method: None,
        };
        self.save(&normalized).await?;
        tracing::info!(previous = %status.tier, "expired subscription normalized to free");
        Ok(true)
    }
}
