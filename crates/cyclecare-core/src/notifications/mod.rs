//! Notification planning and reconciliation.
//!
//! - [`plan`]: forecast events -> desired notifications (pure)
//! - [`scheduler`]: desired notifications -> backend calls
//! - [`backend`], [`outbox`]: where notifications actually live

pub mod backend;
pub mod outbox;
pub mod plan;
pub mod scheduler;
pub mod types;

pub use backend::{BackendCalls, LiveNotification, MemoryBackend, NotificationBackend};
pub use outbox::OutboxBackend;
pub use plan::{desired_notifications, notification_id, reminder_feature, version_prefix, ID_ROOT};
pub use scheduler::NotificationScheduler;
pub use types::{
    AppliedSchedule, FailedOperation, NotificationKind, NotificationPayload, Operation,
    ReconciliationReport, ScheduleState, ScheduledNotification,
};
