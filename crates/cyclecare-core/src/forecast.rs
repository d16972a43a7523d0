//! Forecast of upcoming cycle events.
//!
//! A [`Forecast`] is a lazy, finite iterator over [`PredictedEvent`]s for a
//! fixed number of cycles. It is `Clone`, so the same inputs can be replayed
//! and always yield the same sequence.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

use crate::cycle::{CycleModel, CycleProfile};
use crate::error::{CoreError, Result};

/// Events emitted per forecast cycle.
pub const EVENTS_PER_CYCLE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PeriodStart,
    FertileWindowStart,
    Ovulation,
    FertileWindowEnd,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::PeriodStart,
        EventType::FertileWindowStart,
        EventType::Ovulation,
        EventType::FertileWindowEnd,
    ];

    /// Stable short name, used in notification ids.
    pub fn slug(&self) -> &'static str {
        match self {
            EventType::PeriodStart => "period",
            EventType::FertileWindowStart => "fertile-start",
            EventType::Ovulation => "ovulation",
            EventType::FertileWindowEnd => "fertile-end",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventType::PeriodStart => "Period start",
            EventType::FertileWindowStart => "Fertile window opens",
            EventType::Ovulation => "Ovulation",
            EventType::FertileWindowEnd => "Fertile window closes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Regular,
    EstimatedIrregular,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictedEvent {
    pub event_type: EventType,
    pub date: NaiveDate,
    /// 0-based index of the forecast cycle this event belongs to.
    pub cycle_index: u32,
    pub confidence: Confidence,
}

/// Lazy event sequence for `cycle_count` consecutive cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forecast {
    first_boundary: NaiveDate,
    cycle_length: i64,
    /// Days from the boundary to ovulation, i.e. ovulation day minus one.
    ovulation_offset: i64,
    /// Fertile window lead and tail, clamped so the window stays inside
    /// its own cycle.
    fertile_lead: i64,
    fertile_tail: i64,
    confidence: Confidence,
    cycle_count: u32,
    position: usize,
}

impl Forecast {
    /// Date of the first predicted period start.
    pub fn first_boundary(&self) -> NaiveDate {
        self.first_boundary
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    fn total(&self) -> usize {
        self.cycle_count as usize * EVENTS_PER_CYCLE
    }

    /// The four events of one cycle, ordered by date.
    fn cycle_events(&self, cycle_index: u32) -> [PredictedEvent; EVENTS_PER_CYCLE] {
        let boundary = self.first_boundary + Duration::days(self.cycle_length * i64::from(cycle_index));
        let ovulation = boundary + Duration::days(self.ovulation_offset);
        let event = |event_type, date| PredictedEvent {
            event_type,
            date,
            cycle_index,
            confidence: self.confidence,
        };
        let mut events = [
            event(EventType::PeriodStart, boundary),
            event(
                EventType::FertileWindowStart,
                ovulation - Duration::days(self.fertile_lead),
            ),
            event(EventType::Ovulation, ovulation),
            event(
                EventType::FertileWindowEnd,
                ovulation + Duration::days(self.fertile_tail),
            ),
        ];
        events.sort_by_key(|e| (e.date, e.event_type));
        events
    }
}

impl Iterator for Forecast {
    type Item = PredictedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total() {
            return None;
        }
        let cycle_index = (self.position / EVENTS_PER_CYCLE) as u32;
        let slot = self.position % EVENTS_PER_CYCLE;
        self.position += 1;
        Some(self.cycle_events(cycle_index)[slot].clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Forecast {}

impl FusedIterator for Forecast {}

impl CycleModel {
    /// Forecast `cycle_count` cycles starting at the first boundary on or
    /// after `from_date`.
    pub fn forecast(
        &self,
        profile: &CycleProfile,
        from_date: NaiveDate,
        cycle_count: u32,
    ) -> Result<Forecast> {
        if cycle_count < 1 {
            return Err(CoreError::invalid_argument(
                "cycle_count",
                "must be at least 1",
            ));
        }
        let first_boundary = self.next_period_start(profile, from_date)?;
        let (fertile_lead, fertile_tail) = self.fertile_span(profile)?;

        Ok(Forecast {
            first_boundary,
            cycle_length: i64::from(profile.cycle_length_days),
            ovulation_offset: i64::from(self.ovulation_day(profile)? - 1),
            fertile_lead: i64::from(fertile_lead),
            fertile_tail: i64::from(fertile_tail),
            confidence: if profile.is_regular {
                Confidence::Regular
            } else {
                Confidence::EstimatedIrregular
            },
            cycle_count,
            position: 0,
        })
    }
}

/// Forecast under the default constants.
pub fn forecast(profile: &CycleProfile, from_date: NaiveDate, cycle_count: u32) -> Result<Forecast> {
    CycleModel::default().forecast(profile, from_date, cycle_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::CycleConstants;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile() -> CycleProfile {
        CycleProfile::new(date(2025, 1, 1))
    }

    #[test]
    fn three_cycles_yield_three_period_starts() {
        let events: Vec<_> = forecast(&profile(), date(2025, 1, 1), 3).unwrap().collect();
        assert_eq!(events.len(), 12);

        let starts: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventType::PeriodStart)
            .map(|e| e.date)
            .collect();
        assert_eq!(starts, vec![date(2025, 1, 1), date(2025, 1, 29), date(2025, 2, 26)]);
    }

    #[test]
    fn first_cycle_event_dates() {
        let events: Vec<_> = forecast(&profile(), date(2025, 1, 1), 1).unwrap().collect();
        let find = |t| events.iter().find(|e| e.event_type == t).unwrap().date;

        assert_eq!(find(EventType::PeriodStart), date(2025, 1, 1));
        assert_eq!(find(EventType::FertileWindowStart), date(2025, 1, 9));
        assert_eq!(find(EventType::Ovulation), date(2025, 1, 14));
        assert_eq!(find(EventType::FertileWindowEnd), date(2025, 1, 15));
    }

    #[test]
    fn ovulation_event_matches_phase_model() {
        let p = profile().with_cycle_length(31);
        let model = CycleModel::default();
        for event in model.forecast(&p, date(2025, 3, 10), 4).unwrap() {
            if event.event_type == EventType::Ovulation {
                let (_, phase) = model.phase_at(&p, event.date).unwrap();
                assert_eq!(phase, crate::cycle::CyclePhase::Ovulation);
            }
        }
    }

    #[test]
    fn starts_at_next_boundary_mid_cycle() {
        let events: Vec<_> = forecast(&profile(), date(2025, 1, 10), 1).unwrap().collect();
        assert_eq!(events[0].event_type, EventType::PeriodStart);
        assert_eq!(events[0].date, date(2025, 1, 29));
        assert!(events.iter().all(|e| e.cycle_index == 0));
    }

    #[test]
    fn sequence_is_date_ordered() {
        let events: Vec<_> = forecast(&profile(), date(2025, 1, 1), 6).unwrap().collect();
        assert!(events.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn wide_fertile_window_stays_inside_its_cycle() {
        let model = CycleModel::new(CycleConstants {
            fertile_window_lead_days: 20,
            fertile_window_tail_days: 20,
            ..CycleConstants::default()
        });
        let events: Vec<_> = model
            .forecast(&profile(), date(2025, 1, 1), 2)
            .unwrap()
            .map(|e| (e.date, e.event_type))
            .collect();
        assert!(events.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            &events[..4],
            &[
                (date(2025, 1, 1), EventType::PeriodStart),
                (date(2025, 1, 1), EventType::FertileWindowStart),
                (date(2025, 1, 14), EventType::Ovulation),
                (date(2025, 1, 28), EventType::FertileWindowEnd),
            ]
        );
        assert_eq!(events[4], (date(2025, 1, 29), EventType::PeriodStart));
    }

    #[test]
    fn forecast_is_restartable_and_deterministic() {
        let fc = forecast(&profile(), date(2025, 2, 3), 3).unwrap();
        let first: Vec<_> = fc.clone().collect();
        let second: Vec<_> = fc.collect();
        let fresh: Vec<_> = forecast(&profile(), date(2025, 2, 3), 3).unwrap().collect();
        assert_eq!(first, second);
        assert_eq!(first, fresh);
    }

    #[test]
    fn exact_size() {
        let mut fc = forecast(&profile(), date(2025, 1, 1), 2).unwrap();
        assert_eq!(fc.len(), 8);
        fc.next();
        assert_eq!(fc.len(), 7);
    }

    #[test]
    fn irregular_profile_is_estimated() {
        let p = profile().with_regularity(false);
        assert!(forecast(&p, date(2025, 1, 1), 2)
            .unwrap()
            .all(|e| e.confidence == Confidence::EstimatedIrregular));
    }

    #[test]
    fn zero_cycles_is_invalid() {
        assert!(matches!(
            forecast(&profile(), date(2025, 1, 1), 0),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let p = profile().with_cycle_length(3);
        assert!(matches!(
            forecast(&p, date(2025, 1, 1), 1),
            Err(CoreError::InvalidProfile(_))
        ));
    }
}
