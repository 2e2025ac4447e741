//! Controller configuration loaded from YAML (~/.config/credsync/config.yaml)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::logging::LogLevel;

/// Provider API used when none is configured
pub const DEFAULT_API_URL: &str = "https://api.credsync.invalid/v1";

/// Seconds between full resyncs of the spec objects
pub const DEFAULT_RESYNC_SECS: u64 = 10;

/// Controller settings
///
/// Every field is optional in the file. Environment variables override
/// the file:
///
/// | Variable | Field |
/// |---|---|
/// | `CREDSYNC_API_URL` | `api_url` |
/// | `CREDSYNC_API_TOKEN` | `api_token` |
/// | `CREDSYNC_TEAM` | `team` |
/// | `CREDSYNC_NAMESPACE` | `namespace` |
/// | `CREDSYNC_RESYNC_SECS` | `resync_interval_secs` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub api_url: String,
    pub api_token: String,
    /// Global team label; empty means no team scope
    pub team: String,
    /// Namespace for spec documents that do not name one
    pub namespace: String,
    pub resync_interval_secs: u64,
    pub log_level: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: String::new(),
            team: String::new(),
            namespace: "default".to_string(),
            resync_interval_secs: DEFAULT_RESYNC_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    /// User-level config path (~/.config/credsync/config.yaml)
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("credsync").join("config.yaml")
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from `path` (or the default path), then apply the process
    /// environment. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = if path.exists() {
            Self::from_yaml_str(&fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `lookup`, which maps variable names to values
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CREDSYNC_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("CREDSYNC_API_TOKEN") {
            self.api_token = v;
        }
        if let Some(v) = lookup("CREDSYNC_TEAM") {
            self.team = v;
        }
        if let Some(v) = lookup("CREDSYNC_NAMESPACE") {
            self.namespace = v;
        }
        if let Some(v) = lookup("CREDSYNC_RESYNC_SECS") {
            self.resync_interval_secs = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CREDSYNC_RESYNC_SECS".to_string(),
                message: format!("'{}' is not a number of seconds", v),
            })?;
        }
        Ok(())
    }

    /// Global team label, if one is configured
    pub fn team_label(&self) -> Option<&str> {
        if self.team.is_empty() {
            None
        } else {
            Some(&self.team)
        }
    }

    /// Resync period, never shorter than one second
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }

    pub fn log_level(&self) -> ConfigResult<LogLevel> {
        self.log_level.parse().map_err(|message| ConfigError::Invalid {
            key: "log_level".to_string(),
            message,
        })
    }
}
