pub mod config;
pub mod forecast;
pub mod notify;
pub mod phase;
pub mod profile;
pub mod subscription;

use chrono::{Local, NaiveDate};
use cyclecare_core::{Config, CycleCare, CycleProfile, OutboxBackend, SqliteStore};
use std::sync::Arc;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Engine wired to the on-disk store and the notification outbox.
pub struct Context {
    pub care: CycleCare,
    pub outbox: Arc<OutboxBackend>,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let store = Arc::new(SqliteStore::open()?);
        let outbox = Arc::new(OutboxBackend::open_default()?);
        let care = CycleCare::new(config, store, outbox.clone());
        Ok(Self { care, outbox })
    }

    pub async fn require_profile(&self) -> Result<CycleProfile, Box<dyn std::error::Error>> {
        match self.care.load_profile().await? {
            Some(profile) => Ok(profile),
            None => Err("no cycle profile set (run `profile set --anchor YYYY-MM-DD`)".into()),
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse `YYYY-MM-DD`, defaulting to today.
pub fn parse_date(value: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match value {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}").into()),
        None => Ok(today()),
    }
}
