//! Persisted subscription status.
//!
//! Expiry is never stored. [`SubscriptionStatus::is_expired_at`] is the one
//! predicate every caller uses, so stored state and wall-clock time can't
//! disagree.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use super::tier::Tier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub tier: Tier,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::free()
    }
}

impl SubscriptionStatus {
    /// Active free tier with no end date.
    pub fn free() -> Self {
        Self {
            tier: Tier::Free,
            is_active: true,
            start_date: None,
            end_date: None,
            auto_renew: false,
            payment_method: None,
        }
    }

    /// A paid subscription running for `months` from `now`.
    pub fn paid(
        tier: Tier,
        now: DateTime<Utc>,
        months: u32,
        auto_renew: bool,
        payment_method: Option<String>,
    ) -> Self {
        Self {
            tier,
            is_active: true,
            start_date: Some(now),
            end_date: now.checked_add_months(Months::new(months)),
            auto_renew,
            payment_method,
        }
    }

    /// `end_date` is set and `now` is past it.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_date, Some(end) if now > end)
    }

    /// Tier used for gating: the stored tier while active and unexpired,
    /// otherwise `Free`.
    pub fn effective_tier(&self, now: DateTime<Utc>) -> Tier {
        if self.is_active && !self.is_expired_at(now) {
            self.tier
        } else {
            Tier::Free
        }
    }

    /// Whole days until `end_date`, if any. Zero once expired.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.end_date.map(|end| (end - now).num_days().max(0))
    }

    /// Whether stored state still claims a paid tier after expiry.
    pub fn needs_normalization(&self, now: DateTime<Utc>) -> bool {
        self.tier.is_paid() && (self.is_expired_at(now) || !self.is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn free_status_never_expires() {
        let status = SubscriptionStatus::free();
        assert!(!status.is_expired_at(now()));
        assert_eq!(status.effective_tier(now()), Tier::Free);
        assert!(status.days_remaining(now()).is_none());
    }

    #[test]
    fn paid_status_runs_for_months() {
        let status = SubscriptionStatus::paid(Tier::Premium, now(), 1, true, None);
        assert_eq!(status.end_date, Some(Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()));
        assert_eq!(status.effective_tier(now()), Tier::Premium);
        assert_eq!(status.days_remaining(now()), Some(30));
    }

    #[test]
    fn expiry_is_strictly_after_end_date() {
        let status = SubscriptionStatus::paid(Tier::Premium, now(), 1, false, None);
        let end = status.end_date.unwrap();
        assert!(!status.is_expired_at(end));
        assert!(status.is_expired_at(end + Duration::seconds(1)));
    }

    #[test]
    fn expired_premium_gates_as_free() {
        let mut status = SubscriptionStatus::paid(Tier::Premium, now(), 1, false, None);
        status.end_date = Some(now() - Duration::days(1));
        assert_eq!(status.tier, Tier::Premium);
        assert_eq!(status.effective_tier(now()), Tier::Free);
        assert!(status.needs_normalization(now()));
    }

    #[test]
    fn inactive_status_gates_as_free() {
        let mut status = SubscriptionStatus::paid(Tier::PremiumPlus, now(), 12, true, None);
        status.is_active = false;
        assert_eq!(status.effective_tier(now()), Tier::Free);
    }

    #[test]
    fn status_roundtrips_through_json() {
        let status = SubscriptionStatus::paid(
            Tier::PremiumPlus,
            now(),
            12,
            true,
            Some("card".to_string()),
        );
        let json = serde_json::to_string(&status).unwrap();
        let parsed: SubscriptionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
