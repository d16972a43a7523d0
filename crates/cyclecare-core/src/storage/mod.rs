mod config;
pub mod database;
pub mod kv;

pub use config::{Config, CycleConfig, RemindersConfig};
pub use database::SqliteStore;
pub use kv::{KeyValueStore, MemoryStore};

use std::path::PathBuf;

/// Key holding the serialized `SubscriptionStatus`.
pub const SUBSCRIPTION_KEY: &str = "subscription_status";
/// Key holding the last applied notification schedule.
pub const SCHEDULE_KEY: &str = "notification_schedule";
/// Key holding the user's cycle profile.
pub const PROFILE_KEY: &str = "cycle_profile";

/// Returns `~/.config/cyclecare[-dev]/` based on CYCLECARE_ENV.
///
/// Set CYCLECARE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CYCLECARE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("cyclecare-dev")
    } else {
        base_dir.join("cyclecare")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
