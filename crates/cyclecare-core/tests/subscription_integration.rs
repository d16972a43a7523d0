//! Integration tests for subscription state and feature gating.

use chrono::{DateTime, Duration, TimeZone, Utc};
use cyclecare_core::subscription::{
    TierPolicyTable, FERTILE_WINDOW_REMINDER, OVULATION_REMINDER, PERIOD_REMINDER,
};
use cyclecare_core::{
    has_access, Config, CycleCare, FeatureGate, MemoryBackend, MemoryStore, SqliteStore,
    SubscriptionStatus, Tier,
};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap()
}

fn engine_with(store: Arc<dyn cyclecare_core::KeyValueStore>) -> CycleCare {
    CycleCare::new(Config::default(), store, Arc::new(MemoryBackend::new()))
}

#[tokio::test]
async fn subscription_lifecycle() {
    let care = engine_with(Arc::new(MemoryStore::new()));
    assert!(care.has_feature_access_at(PERIOD_REMINDER, now()).await);
    assert!(!care.has_feature_access_at(OVULATION_REMINDER, now()).await);

    let status = care
        .subscribe(Tier::Premium, 1, true, Some("card".into()), now())
        .await
        .unwrap();
    assert_eq!(status.days_remaining(now()), Some(31));
    assert!(care.has_feature_access_at(OVULATION_REMINDER, now()).await);

    // Cancelling keeps access until the paid period ends.
    let cancelled = care.cancel_subscription(now() + Duration::days(5)).await.unwrap();
    assert!(!cancelled.auto_renew);
    assert!(care
        .has_feature_access_at(OVULATION_REMINDER, now() + Duration::days(10))
        .await);

    let after_end = now() + Duration::days(40);
    assert!(!care.has_feature_access_at(OVULATION_REMINDER, after_end).await);
    assert!(care.normalize_subscription(after_end).await.unwrap());
    assert_eq!(care.subscriptions().current().tier, Tier::Free);
}

#[tokio::test]
async fn status_survives_reopen_of_sqlite_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("cyclecare.db");

    {
        let care = engine_with(Arc::new(SqliteStore::open_at(&path).unwrap()));
        care.subscribe(Tier::PremiumPlus, 12, true, None, now())
            .await
            .unwrap();
    }

    let care = engine_with(Arc::new(SqliteStore::open_at(&path).unwrap()));
    assert!(care.has_feature_access_at("doctor_consultation", now()).await);
    assert_eq!(care.subscriptions().load().await.tier, Tier::PremiumPlus);
}

#[tokio::test]
async fn unreadable_status_falls_back_to_last_known() {
    let store = Arc::new(MemoryStore::new());
    let care = engine_with(store.clone());
    care.subscribe(Tier::Premium, 1, true, None, now())
        .await
        .unwrap();

    store.set_fail_reads(true);
    assert!(care.has_feature_access_at(FERTILE_WINDOW_REMINDER, now()).await);
}

#[test]
fn gate_denies_inactive_paid_status() {
    let mut status = SubscriptionStatus::paid(Tier::PremiumPlus, now(), 6, true, None);
    status.is_active = false;
    assert!(!has_access(&status, FERTILE_WINDOW_REMINDER, now()));
    assert!(has_access(&status, PERIOD_REMINDER, now()));
}

#[test]
fn custom_policy_table() {
    let gate = FeatureGate::new(
        TierPolicyTable::empty()
            .with_feature("beta_insights", Tier::Premium)
            .with_feature(PERIOD_REMINDER, Tier::Free),
    );
    let premium = SubscriptionStatus::paid(Tier::Premium, now(), 1, false, None);
    assert!(gate.has_access(&premium, "beta_insights", now()));
    assert!(!gate.has_access(&SubscriptionStatus::free(), "beta_insights", now()));
    assert!(!gate.has_access(&premium, OVULATION_REMINDER, now()));
}

#[test]
fn end_date_boundary_is_inclusive() {
    let status = SubscriptionStatus::paid(Tier::Premium, now(), 1, false, None);
    let end = status.end_date.unwrap();
    assert!(has_access(&status, OVULATION_REMINDER, end));
    assert!(!has_access(&status, OVULATION_REMINDER, end + Duration::seconds(1)));
}
