//! Tier policy table: which tier a feature requires.
//!
//! Each feature is mapped to the lowest tier that unlocks it. Higher tiers
//! inherit everything below them, so access is monotonic by construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tier::Tier;

pub const PERIOD_REMINDER: &str = "period_reminder";
pub const OVULATION_REMINDER: &str = "ovulation_reminder";
pub const FERTILE_WINDOW_REMINDER: &str = "fertile_window_reminder";

/// Built-in feature table.
const BUILTIN_POLICY: &[(&str, Tier)] = &[
    ("cycle_tracking", Tier::Free),
    ("phase_insights", Tier::Free),
    ("symptom_log", Tier::Free),
    (PERIOD_REMINDER, Tier::Free),
    (OVULATION_REMINDER, Tier::Premium),
    (FERTILE_WINDOW_REMINDER, Tier::Premium),
    ("cycle_history", Tier::Premium),
    ("advanced_analytics", Tier::Premium),
    ("data_export", Tier::Premium),
    ("personalized_content", Tier::PremiumPlus),
    ("doctor_consultation", Tier::PremiumPlus),
    ("video_consultation", Tier::PremiumPlus),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicyTable {
    entries: BTreeMap<String, Tier>,
}

impl Default for TierPolicyTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN_POLICY
                .iter()
                .map(|(id, tier)| (id.to_string(), *tier))
                .collect(),
        }
    }
}

impl TierPolicyTable {
    /// A table with no features; everything is denied.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or override a feature's minimum tier.
    pub fn with_feature(mut self, feature_id: &str, min_tier: Tier) -> Self {
        self.entries.insert(feature_id.to_string(), min_tier);
        self
    }

    /// Lowest tier that unlocks `feature_id`, or `None` if unknown.
    pub fn min_tier(&self, feature_id: &str) -> Option<Tier> {
        self.entries.get(feature_id).copied()
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.entries.contains_key(feature_id)
    }

    /// Every feature available at `tier`, sorted by id.
    pub fn features_for(&self, tier: Tier) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, min)| tier.includes(**min))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn feature_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_features_are_registered() {
        let table = TierPolicyTable::default();
        assert_eq!(table.min_tier(PERIOD_REMINDER), Some(Tier::Free));
        assert_eq!(table.min_tier(OVULATION_REMINDER), Some(Tier::Premium));
        assert_eq!(table.min_tier(FERTILE_WINDOW_REMINDER), Some(Tier::Premium));
    }

    #[test]
    fn unknown_feature_has_no_tier() {
        assert!(TierPolicyTable::default().min_tier("teleportation").is_none());
    }

    #[test]
    fn feature_sets_nest() {
        let table = TierPolicyTable::default();
        let free = table.features_for(Tier::Free);
        let premium = table.features_for(Tier::Premium);
        let plus = table.features_for(Tier::PremiumPlus);

        assert!(free.iter().all(|f| premium.contains(f)));
        assert!(premium.iter().all(|f| plus.contains(f)));
        assert_eq!(plus.len(), table.feature_ids().count());
    }

    #[test]
    fn override_replaces_entry() {
        let table = TierPolicyTable::default().with_feature(OVULATION_REMINDER, Tier::Free);
        assert_eq!(table.min_tier(OVULATION_REMINDER), Some(Tier::Free));
    }
}
