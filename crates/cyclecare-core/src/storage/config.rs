//! TOML-based application configuration.
//!
//! Stores:
//! - Cycle constants (luteal length, fertile window offsets, profile defaults)
//! - Reminder preferences (enabled, irregular lead time, forecast horizon)
//!
//! Configuration is stored at `~/.config/cyclecare/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::cycle::CycleConstants;
use crate::error::ConfigError;

/// Cycle arithmetic constants and profile defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_luteal_length")]
    pub luteal_length_days: u32,
    /// Days before ovulation the fertile window opens.
    #[serde(default = "default_fertile_lead")]
    pub fertile_window_lead_days: u32,
    /// Days after ovulation the fertile window closes.
    #[serde(default = "default_fertile_tail")]
    pub fertile_window_tail_days: u32,
    #[serde(default = "default_cycle_length")]
    pub default_cycle_length_days: u32,
    #[serde(default = "default_period_length")]
    pub default_period_length_days: u32,
}

/// Reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How many days ahead of an irregular-cycle event the early warning fires.
    #[serde(default = "default_irregular_lead")]
    pub irregular_lead_days: u32,
    /// Number of upcoming cycles to keep scheduled.
    #[serde(default = "default_forecast_cycles")]
    pub forecast_cycles: u32,
    /// Local wall-clock hour notifications fire at.
    #[serde(default = "default_notify_hour")]
    pub notify_hour: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/cyclecare/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
}

fn default_luteal_length() -> u32 {
    14
}
fn default_fertile_lead() -> u32 {
    5
}
fn default_fertile_tail() -> u32 {
    1
}
fn default_cycle_length() -> u32 {
    28
}
fn default_period_length() -> u32 {
    5
}
fn default_true() -> bool {
    true
}
fn default_irregular_lead() -> u32 {
    2
}
fn default_forecast_cycles() -> u32 {
    3
}
fn default_notify_hour() -> u32 {
    9
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            luteal_length_days: default_luteal_length(),
            fertile_window_lead_days: default_fertile_lead(),
            fertile_window_tail_days: default_fertile_tail(),
            default_cycle_length_days: default_cycle_length(),
            default_period_length_days: default_period_length(),
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            irregular_lead_days: default_irregular_lead(),
            forecast_cycles: default_forecast_cycles(),
            notify_hour: default_notify_hour(),
        }
    }
}

impl CycleConfig {
    pub fn constants(&self) -> CycleConstants {
        CycleConstants {
            luteal_length_days: self.luteal_length_days,
            fertile_window_lead_days: self.fertile_window_lead_days,
            fertile_window_tail_days: self.fertile_window_tail_days,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u32>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Check the values the cycle arithmetic depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("cycle.luteal_length_days", self.cycle.luteal_length_days),
            ("cycle.default_cycle_length_days", self.cycle.default_cycle_length_days),
            ("cycle.default_period_length_days", self.cycle.default_period_length_days),
            ("reminders.forecast_cycles", self.reminders.forecast_cycles),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if self.cycle.default_period_length_days >= self.cycle.default_cycle_length_days {
            return Err(ConfigError::InvalidValue {
                key: "cycle.default_period_length_days".to_string(),
                message: "must be shorter than the default cycle length".to_string(),
            });
        }
        let window = [
            ("cycle.fertile_window_lead_days", self.cycle.fertile_window_lead_days),
            ("cycle.fertile_window_tail_days", self.cycle.fertile_window_tail_days),
        ];
        for (key, value) in window {
            if value >= self.cycle.default_cycle_length_days {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be shorter than the default cycle length".to_string(),
                });
            }
        }
        if self.reminders.notify_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "reminders.notify_hour".to_string(),
                message: "must be between 0 and 23".to_string(),
            });
        }
        Ok(())
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed = Config::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.cycle.luteal_length_days, 14);
        assert_eq!(cfg.cycle.fertile_window_lead_days, 5);
        assert_eq!(cfg.cycle.fertile_window_tail_days, 1);
        assert_eq!(cfg.cycle.default_cycle_length_days, 28);
        assert_eq!(cfg.cycle.default_period_length_days, 5);
        assert!(cfg.reminders.enabled);
        assert_eq!(cfg.reminders.irregular_lead_days, 2);
        assert_eq!(cfg.reminders.forecast_cycles, 3);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = Config::from_toml("[cycle]\nluteal_length_days = 12\n").unwrap();
        assert_eq!(cfg.cycle.luteal_length_days, 12);
        assert_eq!(cfg.cycle.fertile_window_lead_days, 5);
        assert_eq!(cfg.reminders, RemindersConfig::default());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("reminders.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("cycle.luteal_length_days").as_deref(), Some("14"));
        assert!(cfg.get("cycle.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("reminders.enabled", "false").unwrap();
        cfg.apply("reminders.irregular_lead_days", "3").unwrap();
        assert!(!cfg.reminders.enabled);
        assert_eq!(cfg.reminders.irregular_lead_days, 3);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("cycle.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.apply("reminders.enabled", "not_a_bool").is_err());
        assert!(cfg.apply("cycle.luteal_length_days", "-4").is_err());
    }

    #[test]
    fn validation_rejects_zero_luteal_length() {
        let mut cfg = Config::default();
        assert!(cfg.apply("cycle.luteal_length_days", "0").is_err());
        assert_eq!(cfg.cycle.luteal_length_days, 14);
    }

    #[test]
    fn validation_bounds_fertile_window() {
        let mut cfg = Config::default();
        assert!(cfg.apply("cycle.fertile_window_tail_days", "28").is_err());
        assert!(cfg.apply("cycle.fertile_window_lead_days", "40").is_err());
        assert_eq!(cfg.cycle.fertile_window_tail_days, 1);
        cfg.apply("cycle.fertile_window_tail_days", "20").unwrap();
        assert_eq!(cfg.cycle.fertile_window_tail_days, 20);
    }

    #[test]
    fn constants_mirror_cycle_config() {
        let cfg = Config::default();
        assert_eq!(cfg.cycle.constants(), CycleConstants::default());
    }
}
