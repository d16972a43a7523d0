//! Pure cycle-day and phase computation.
//!
//! Everything here is a function of a `CycleProfile`, a query date and the
//! `CycleConstants`. No clock, no I/O: callers pass "today" explicitly, which
//! lets the forecast evaluate arbitrary dates in batch.
//!
//! ## Phase layout
//!
//! ```text
//! day: 1 ........ P | P+1 ....... O-1 | O | O+1 ........ L
//!      Menstrual    | Follicular      |Ov.| Luteal
//! ```
//!
//! `O = L - luteal_length`, clamped to `P + 1` when a short cycle would put
//! ovulation inside the menstrual window.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::profile::CycleProfile;
use crate::error::Result;

/// Luteal phase length used when not configured.
pub const DEFAULT_LUTEAL_LENGTH_DAYS: u32 = 14;

/// Fertile window opens this many days before ovulation (sperm viability).
pub const DEFAULT_FERTILE_WINDOW_LEAD_DAYS: u32 = 5;

/// Fertile window closes this many days after ovulation (ovum viability).
pub const DEFAULT_FERTILE_WINDOW_TAIL_DAYS: u32 = 1;

/// Tunable constants of the cycle arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConstants {
    pub luteal_length_days: u32,
    pub fertile_window_lead_days: u32,
    pub fertile_window_tail_days: u32,
}

impl Default for CycleConstants {
    fn default() -> Self {
        Self {
            luteal_length_days: DEFAULT_LUTEAL_LENGTH_DAYS,
            fertile_window_lead_days: DEFAULT_FERTILE_WINDOW_LEAD_DAYS,
            fertile_window_tail_days: DEFAULT_FERTILE_WINDOW_TAIL_DAYS,
        }
    }
}

/// 1-based position within the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleDay(u32);

impl CycleDay {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CycleDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

impl CyclePhase {
    pub fn label(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Menstrual",
            CyclePhase::Follicular => "Follicular",
            CyclePhase::Ovulation => "Ovulation",
            CyclePhase::Luteal => "Luteal",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cycle model bound to a set of constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleModel {
    constants: CycleConstants,
}

impl CycleModel {
    pub fn new(constants: CycleConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &CycleConstants {
        &self.constants
    }

    /// Cycle day on which ovulation is expected.
    pub fn ovulation_day(&self, profile: &CycleProfile) -> Result<u32> {
        profile.validate()?;
        let length = profile.cycle_length_days;
        let period = profile.period_length_days;
        let raw = length.saturating_sub(self.constants.luteal_length_days);
        if raw <= period {
            Ok(period + 1)
        } else {
            Ok(raw)
        }
    }

    /// Position of `date` within its cycle. Dates before the anchor wrap.
    pub fn cycle_day(&self, profile: &CycleProfile, date: NaiveDate) -> Result<CycleDay> {
        profile.validate()?;
        let length = i64::from(profile.cycle_length_days);
        let offset = (date - profile.anchor_date).num_days();
        // ((offset mod L) + L) mod L, i.e. the non-negative remainder
        let day = offset.rem_euclid(length) + 1;
        Ok(CycleDay(day as u32))
    }

    pub fn phase_for_day(&self, profile: &CycleProfile, day: CycleDay) -> Result<CyclePhase> {
        let ovulation = self.ovulation_day(profile)?;
        let day = day.get();
        let phase = if day <= profile.period_length_days {
            CyclePhase::Menstrual
        } else if day < ovulation {
            CyclePhase::Follicular
        } else if day == ovulation {
            CyclePhase::Ovulation
        } else {
            CyclePhase::Luteal
        };
        Ok(phase)
    }

    pub fn phase_at(&self, profile: &CycleProfile, date: NaiveDate) -> Result<(CycleDay, CyclePhase)> {
        let day = self.cycle_day(profile, date)?;
        let phase = self.phase_for_day(profile, day)?;
        Ok((day, phase))
    }

    /// First day of the cycle containing `date`.
    pub fn cycle_start(&self, profile: &CycleProfile, date: NaiveDate) -> Result<NaiveDate> {
        let day = self.cycle_day(profile, date)?;
        Ok(date - Duration::days(i64::from(day.get() - 1)))
    }

    /// First cycle boundary on or after `date`.
    pub fn next_period_start(&self, profile: &CycleProfile, date: NaiveDate) -> Result<NaiveDate> {
        let day = self.cycle_day(profile, date)?.get();
        if day == 1 {
            return Ok(date);
        }
        Ok(date + Duration::days(i64::from(profile.cycle_length_days - day + 1)))
    }

    /// Days until the next period starts, counting strictly after `date`.
    ///
    /// On cycle day 1 this is the full cycle length.
    pub fn days_until_next_period(&self, profile: &CycleProfile, date: NaiveDate) -> Result<u32> {
        let day = self.cycle_day(profile, date)?.get();
        Ok(profile.cycle_length_days - day + 1)
    }

    /// Ovulation date of the cycle starting at `cycle_start`.
    pub fn ovulation_date(&self, profile: &CycleProfile, cycle_start: NaiveDate) -> Result<NaiveDate> {
        let ovulation = self.ovulation_day(profile)?;
        Ok(cycle_start + Duration::days(i64::from(ovulation - 1)))
    }

    /// Days before and after ovulation covered by the fertile window, cut
    /// back so the window never leaves its cycle.
    pub fn fertile_span(&self, profile: &CycleProfile) -> Result<(u32, u32)> {
        let ovulation = self.ovulation_day(profile)?;
        let lead = self.constants.fertile_window_lead_days.min(ovulation - 1);
        let tail = self
            .constants
            .fertile_window_tail_days
            .min(profile.cycle_length_days - ovulation);
        Ok((lead, tail))
    }

    /// Inclusive fertile window of the cycle containing `date`.
    pub fn fertile_window(
        &self,
        profile: &CycleProfile,
        date: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let start = self.cycle_start(profile, date)?;
        let ovulation = self.ovulation_date(profile, start)?;
        let (lead, tail) = self.fertile_span(profile)?;
        Ok((
            ovulation - Duration::days(i64::from(lead)),
            ovulation + Duration::days(i64::from(tail)),
        ))
    }
}

/// Cycle day and phase of `date` under the default constants.
pub fn phase_at(profile: &CycleProfile, date: NaiveDate) -> Result<(CycleDay, CyclePhase)> {
    CycleModel::default().phase_at(profile, date)
}
