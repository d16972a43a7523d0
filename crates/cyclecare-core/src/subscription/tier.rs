//! Subscription tier levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
    PremiumPlus,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::PremiumPlus];

    /// Numeric rank for comparison. Higher rank = more features.
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Free => 0,
            Tier::Premium => 1,
            Tier::PremiumPlus => 2,
        }
    }

    /// Whether this tier includes everything `other` includes.
    pub fn includes(&self, other: Tier) -> bool {
        self.rank() >= other.rank()
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, Tier::Free)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Premium => "Premium",
            Tier::PremiumPlus => "Premium Plus",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "premium_plus" | "premiumplus" => Ok(Tier::PremiumPlus),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_ordered() {
        assert!(Tier::PremiumPlus.includes(Tier::Premium));
        assert!(Tier::Premium.includes(Tier::Free));
        assert!(!Tier::Free.includes(Tier::Premium));
    }

    #[test]
    fn tier_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Tier::PremiumPlus).unwrap(), "\"premium_plus\"");
        let tier: Tier = serde_json::from_str("\"premium\"").unwrap();
        assert_eq!(tier, Tier::Premium);
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("premium-plus".parse::<Tier>().unwrap(), Tier::PremiumPlus);
        assert_eq!("PremiumPlus".parse::<Tier>().unwrap(), Tier::PremiumPlus);
        assert_eq!("Free".parse::<Tier>().unwrap(), Tier::Free);
        assert!("gold".parse::<Tier>().is_err());
    }
}
