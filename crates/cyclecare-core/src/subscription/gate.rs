//! Feature gate: tier policy + subscription status -> allow/deny.
//!
//! The gate is read-only. It never writes back an expired status; that is
//! the job of [`SubscriptionStore::normalize_expired`](super::SubscriptionStore::normalize_expired).

use chrono::{DateTime, Utc};

use super::policy::TierPolicyTable;
use super::status::SubscriptionStatus;

#[derive(Debug, Clone, Default)]
pub struct FeatureGate {
    policy: TierPolicyTable,
}

impl FeatureGate {
    pub fn new(policy: TierPolicyTable) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TierPolicyTable {
        &self.policy
    }

    /// Unknown features are denied.
    pub fn has_access(
        &self,
        status: &SubscriptionStatus,
        feature_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match self.policy.min_tier(feature_id) {
            Some(required) => status.effective_tier(now).includes(required),
            None => {
                tracing::debug!(feature_id, "unknown feature denied");
                false
            }
        }
    }

    /// Every feature `status` unlocks at `now`.
    pub fn accessible_features(
        &self,
        status: &SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> Vec<&str> {
        self.policy.features_for(status.effective_tier(now))
    }
}

/// Check access against the built-in policy table.
pub fn has_access(status: &SubscriptionStatus, feature_id: &str, now: DateTime<Utc>) -> bool {
    FeatureGate::default().has_access(status, feature_id, now)
}
