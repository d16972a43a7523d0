//! # CycleCare Core Library
//!
//! Cycle phase computation, event forecasting, reminder scheduling and
//! subscription feature gating. The CLI binary is a thin layer over this
//! crate; everything it can do is available here.
//!
//! ## Architecture
//!
//! - **Cycle model**: pure date arithmetic from a [`CycleProfile`] to a cycle
//!   day and [`CyclePhase`]
//! - **Forecast**: lazy iterator of predicted period, ovulation and fertile
//!   window dates
//! - **Notifications**: pure planning of the desired reminder set, and an
//!   async [`NotificationScheduler`] that reconciles a backend with it
//! - **Subscription**: tiers, persisted status and the [`FeatureGate`]
//! - **Storage**: key-value persistence (SQLite or memory) and TOML config
//!
//! ## Key Components
//!
//! - [`CycleCare`]: the engine with store and backend injected
//! - [`CycleModel`]: phase and forecast computation
//! - [`NotificationBackend`]: seam to the platform notification center
//! - [`KeyValueStore`]: seam to persistence

pub mod cycle;
pub mod error;
pub mod forecast;
pub mod notifications;
pub mod service;
pub mod storage;
pub mod subscription;

pub use cycle::{phase_at, CycleDay, CycleModel, CyclePhase, CycleProfile, ProfileUpdate};
pub use error::{BackendError, ConfigError, CoreError, StorageError};
pub use forecast::{forecast, Confidence, EventType, Forecast, PredictedEvent};
pub use notifications::{
    MemoryBackend, NotificationBackend, NotificationScheduler, OutboxBackend,
    ReconciliationReport, ScheduledNotification,
};
pub use service::CycleCare;
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use subscription::{has_access, FeatureGate, SubscriptionStatus, Tier};
