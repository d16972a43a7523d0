//! Desired notification set for a profile version.
//!
//! Planning is pure: forecast events in, notifications out. Feature access
//! is passed in as a predicate so the gate can be swapped in tests.

use chrono::{Duration, NaiveDate, NaiveTime};
use std::collections::BTreeMap;

use super::types::{NotificationKind, NotificationPayload, ScheduledNotification};
use crate::cycle::CycleProfile;
use crate::forecast::{Confidence, EventType, PredictedEvent};
use crate::storage::RemindersConfig;
use crate::subscription::{FERTILE_WINDOW_REMINDER, OVULATION_REMINDER, PERIOD_REMINDER};

/// Prefix shared by every notification id this engine creates.
pub const ID_ROOT: &str = "cycle-";

/// Prefix shared by every notification id of one profile version.
pub fn version_prefix(version: u64) -> String {
    format!("{ID_ROOT}v{version}-")
}

pub fn notification_id(
    version: u64,
    event_type: EventType,
    cycle_index: u32,
    kind: NotificationKind,
) -> String {
    let suffix = match kind {
        NotificationKind::DayOf => "",
        NotificationKind::EarlyWarning => "-early",
    };
    format!(
        "{}{}-{}{}",
        version_prefix(version),
        event_type.slug(),
        cycle_index,
        suffix
    )
}

/// Feature id gating reminders for `event_type`.
pub fn reminder_feature(event_type: EventType) -> &'static str {
    match event_type {
        EventType::PeriodStart => PERIOD_REMINDER,
        EventType::Ovulation => OVULATION_REMINDER,
        EventType::FertileWindowStart | EventType::FertileWindowEnd => FERTILE_WINDOW_REMINDER,
    }
}

fn payload(event: &PredictedEvent, kind: NotificationKind, lead_days: u32) -> NotificationPayload {
    let date = event.date.format("%b %-d");
    let (title, body) = match (event.event_type, kind) {
        (EventType::PeriodStart, NotificationKind::DayOf) => (
            "Period expected today".to_string(),
            format!("Your next period is predicted to start today ({date})."),
        ),
        (EventType::Ovulation, NotificationKind::DayOf) => (
            "Ovulation day".to_string(),
            format!("Ovulation is predicted for today ({date})."),
        ),
        (EventType::FertileWindowStart, NotificationKind::DayOf) => (
            "Fertile window opens".to_string(),
            format!("Your fertile window is predicted to begin today ({date})."),
        ),
        (EventType::FertileWindowEnd, NotificationKind::DayOf) => (
            "Fertile window closes".to_string(),
            format!("Your fertile window is predicted to end today ({date})."),
        ),
        (event_type, NotificationKind::EarlyWarning) => (
            format!("Heads-up: {}", event_type.label().to_lowercase()),
            format!(
                "{} is estimated in about {lead_days} day(s), on {date}. Irregular cycles can shift this date.",
                event_type.label()
            ),
        ),
    };
    NotificationPayload { title, body }
}

/// Build the notifications that should be live for `profile`.
///
/// - Reminders disabled: nothing.
/// - Each event maps to one day-of notification when its reminder feature is
///   allowed; denied features are skipped.
/// - Irregular profiles get an extra early warning `irregular_lead_days` ahead.
/// - Triggers before `today` are dropped.
///
/// The result is sorted by trigger time and free of duplicate ids.
pub fn desired_notifications<I, F>(
    profile: &CycleProfile,
    events: I,
    settings: &RemindersConfig,
    today: NaiveDate,
    allowed: F,
) -> Vec<ScheduledNotification>
where
    I: IntoIterator<Item = PredictedEvent>,
    F: Fn(&str) -> bool,
{
    if !settings.enabled {
        return Vec::new();
    }

    let fire_at = NaiveTime::from_hms_opt(settings.notify_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut planned: BTreeMap<String, ScheduledNotification> = BTreeMap::new();

    for event in events {
        if !allowed(reminder_feature(event.event_type)) {
            continue;
        }

        let mut kinds = vec![(NotificationKind::DayOf, event.date)];
        if event.confidence == Confidence::EstimatedIrregular && settings.irregular_lead_days > 0 {
            kinds.push((
                NotificationKind::EarlyWarning,
                event.date - Duration::days(i64::from(settings.irregular_lead_days)),
            ));
        }

        for (kind, trigger_date) in kinds {
            if trigger_date < today {
                continue;
            }
            let id = notification_id(profile.version, event.event_type, event.cycle_index, kind);
            planned.entry(id.clone()).or_insert_with(|| ScheduledNotification {
                id,
                event_type: event.event_type,
                kind,
                trigger_at: trigger_date.and_time(fire_at),
                event_date: event.date,
                cycle_index: event.cycle_index,
                cycle_profile_version: profile.version,
                payload: payload(&event, kind, settings.irregular_lead_days),
            });
        }
    }

    let mut notifications: Vec<_> = planned.into_values().collect();
    notifications.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at).then_with(|| a.id.cmp(&b.id)));
    tracing::debug!(
        version = profile.version,
        count = notifications.len(),
        "planned notifications"
    );
    notifications
}
