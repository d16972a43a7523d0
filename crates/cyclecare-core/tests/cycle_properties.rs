//! Property tests for the cycle model and forecast.

use chrono::{Duration, NaiveDate};
use cyclecare_core::{forecast, phase_at, CycleModel, CyclePhase, CycleProfile, EventType};
use proptest::prelude::*;

fn anchor() -> impl Strategy<Value = NaiveDate> {
    (0i64..20_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(offset)
    })
}

/// Valid (cycle length, period length) pairs.
fn lengths() -> impl Strategy<Value = (u32, u32)> {
    (2u32..60).prop_flat_map(|cycle| (Just(cycle), 1u32..cycle))
}

fn profile() -> impl Strategy<Value = CycleProfile> {
    (anchor(), lengths(), any::<bool>()).prop_map(|(anchor, (cycle, period), regular)| {
        CycleProfile::new(anchor)
            .with_cycle_length(cycle)
            .with_period_length(period)
            .with_regularity(regular)
    })
}

proptest! {
    #[test]
    fn cycle_day_is_always_in_range(p in profile(), offset in -2_000i64..2_000) {
        let date = p.anchor_date + Duration::days(offset);
        let (day, _) = phase_at(&p, date).unwrap();
        prop_assert!(day.get() >= 1);
        prop_assert!(day.get() <= p.cycle_length_days);
    }

    #[test]
    fn anchor_is_first_menstrual_day(p in profile()) {
        let (day, phase) = phase_at(&p, p.anchor_date).unwrap();
        prop_assert_eq!(day.get(), 1);
        prop_assert_eq!(phase, CyclePhase::Menstrual);
    }

    #[test]
    fn phase_repeats_every_cycle(p in profile(), offset in -500i64..500, cycles in -5i64..5) {
        let date = p.anchor_date + Duration::days(offset);
        let shifted = date + Duration::days(cycles * i64::from(p.cycle_length_days));
        prop_assert_eq!(phase_at(&p, date).unwrap(), phase_at(&p, shifted).unwrap());
    }

    #[test]
    fn every_cycle_has_exactly_one_ovulation_day(p in profile()) {
        let ovulation_days = (0..p.cycle_length_days)
            .map(|i| p.anchor_date + Duration::days(i64::from(i)))
            .filter(|d| phase_at(&p, *d).unwrap().1 == CyclePhase::Ovulation)
            .count();
        prop_assert_eq!(ovulation_days, 1);
    }

    #[test]
    fn forecast_period_starts_are_one_cycle_apart(p in profile(), offset in 0i64..400, n in 1u32..8) {
        let from = p.anchor_date + Duration::days(offset);
        let starts: Vec<_> = forecast(&p, from, n)
            .unwrap()
            .filter(|e| e.event_type == EventType::PeriodStart)
            .map(|e| e.date)
            .collect();
        prop_assert_eq!(starts.len(), n as usize);
        prop_assert!(starts[0] >= from);
        for pair in starts.windows(2) {
            prop_assert_eq!((pair[1] - pair[0]).num_days(), i64::from(p.cycle_length_days));
        }
    }

    #[test]
    fn forecast_is_deterministic_and_sorted(p in profile(), offset in 0i64..400) {
        let from = p.anchor_date + Duration::days(offset);
        let first: Vec<_> = forecast(&p, from, 3).unwrap().collect();
        let second: Vec<_> = forecast(&p, from, 3).unwrap().collect();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn forecast_ovulation_matches_phase_model(p in profile(), offset in 0i64..400) {
        let from = p.anchor_date + Duration::days(offset);
        let model = CycleModel::default();
        for event in model.forecast(&p, from, 2).unwrap() {
            if event.event_type == EventType::Ovulation {
                let (_, phase) = model.phase_at(&p, event.date).unwrap();
                prop_assert_eq!(phase, CyclePhase::Ovulation);
            }
        }
    }
}
