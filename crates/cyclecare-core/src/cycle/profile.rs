//! User cycle profile.
//!
//! The profile is the single input to every cycle computation. It is
//! versioned: each accepted update bumps `version`, which in turn invalidates
//! every notification id scheduled for the previous version.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Cycle length assumed when the user doesn't know theirs.
pub const DEFAULT_CYCLE_LENGTH_DAYS: u32 = 28;

/// Period length assumed when the user doesn't know theirs.
pub const DEFAULT_PERIOD_LENGTH_DAYS: u32 = 5;

fn default_cycle_length() -> u32 {
    DEFAULT_CYCLE_LENGTH_DAYS
}

fn default_period_length() -> u32 {
    DEFAULT_PERIOD_LENGTH_DAYS
}

fn default_true() -> bool {
    true
}

fn default_version() -> u64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleProfile {
    /// First day of the most recently recorded period.
    pub anchor_date: NaiveDate,
    #[serde(default = "default_cycle_length")]
    pub cycle_length_days: u32,
    #[serde(default = "default_period_length")]
    pub period_length_days: u32,
    #[serde(default = "default_true")]
    pub is_regular: bool,
    #[serde(default = "default_version")]
    pub version: u64,
}

/// A partial edit of a profile. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub anchor_date: Option<NaiveDate>,
    pub cycle_length_days: Option<u32>,
    pub period_length_days: Option<u32>,
    pub is_regular: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.anchor_date.is_none()
            && self.cycle_length_days.is_none()
            && self.period_length_days.is_none()
            && self.is_regular.is_none()
    }
}

impl CycleProfile {
    /// Create a regular profile with default statistics, at version 1.
    pub fn new(anchor_date: NaiveDate) -> Self {
        Self {
            anchor_date,
            cycle_length_days: DEFAULT_CYCLE_LENGTH_DAYS,
            period_length_days: DEFAULT_PERIOD_LENGTH_DAYS,
            is_regular: true,
            version: default_version(),
        }
    }

    /// Build a profile from onboarding answers, filling unknown lengths with defaults.
    pub fn from_onboarding(
        anchor_date: NaiveDate,
        cycle_length_days: Option<u32>,
        period_length_days: Option<u32>,
        is_regular: bool,
    ) -> Result<Self> {
        let profile = Self {
            anchor_date,
            cycle_length_days: cycle_length_days.unwrap_or(DEFAULT_CYCLE_LENGTH_DAYS),
            period_length_days: period_length_days.unwrap_or(DEFAULT_PERIOD_LENGTH_DAYS),
            is_regular,
            version: default_version(),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn with_cycle_length(mut self, days: u32) -> Self {
        self.cycle_length_days = days;
        self
    }

    pub fn with_period_length(mut self, days: u32) -> Self {
        self.period_length_days = days;
        self
    }

    pub fn with_regularity(mut self, is_regular: bool) -> Self {
        self.is_regular = is_regular;
        self
    }

    /// Reject statistics the cycle model cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.cycle_length_days == 0 {
            return Err(CoreError::InvalidProfile(
                "cycle length must be greater than zero".to_string(),
            ));
        }
        if self.period_length_days == 0 {
            return Err(CoreError::InvalidProfile(
                "period length must be greater than zero".to_string(),
            ));
        }
        if self.cycle_length_days <= self.period_length_days {
            return Err(CoreError::InvalidProfile(format!(
                "cycle length ({}) must exceed period length ({})",
                self.cycle_length_days, self.period_length_days
            )));
        }
        Ok(())
    }

    /// Apply an edit, returning the next profile version.
    ///
    /// An empty update returns the profile unchanged (same version). The
    /// current profile is never modified in place.
    pub fn update(&self, update: &ProfileUpdate) -> Result<CycleProfile> {
        if update.is_empty() {
            return Ok(self.clone());
        }

        let next = CycleProfile {
            anchor_date: update.anchor_date.unwrap_or(self.anchor_date),
            cycle_length_days: update.cycle_length_days.unwrap_or(self.cycle_length_days),
            period_length_days: update.period_length_days.unwrap_or(self.period_length_days),
            is_regular: update.is_regular.unwrap_or(self.is_regular),
            version: self.version + 1,
        };
        next.validate()?;
        Ok(next)
    }
}
