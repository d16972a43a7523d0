//! Subscription tiers, persisted status and the feature gate.

pub mod gate;
pub mod policy;
pub mod status;
pub mod store;
pub mod tier;

pub use gate::{has_access, FeatureGate};
pub use policy::{TierPolicyTable, FERTILE_WINDOW_REMINDER, OVULATION_REMINDER, PERIOD_REMINDER};
pub use status::SubscriptionStatus;
pub use store::SubscriptionStore;
pub use tier::Tier;
