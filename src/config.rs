//! Configuration loading and management
//!
//! Settings live in `~/.propquest/config.toml`. Every section is
//! optional; missing values fall back to the defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::progression::DailyPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Override for the progression database path
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub daily: DailySettings,
}

/// Local HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Port the API server binds on localhost
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Auth token required in the X-PROPQUEST-Token header (empty
    /// disables auth)
    #[serde(default)]
    pub token: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            token: String::new(),
        }
    }
}

fn default_http_port() -> u16 {
    9630
}

/// Daily-bonus tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySettings {
    #[serde(default = "default_base_xp")]
    pub base_xp: i64,

    #[serde(default = "default_streak_step")]
    pub streak_step: i64,

    #[serde(default = "default_streak_cap")]
    pub streak_cap: i64,
}

impl Default for DailySettings {
    fn default() -> Self {
        Self {
            base_xp: default_base_xp(),
            streak_step: default_streak_step(),
            streak_cap: default_streak_cap(),
        }
    }
}

fn default_base_xp() -> i64 {
    5
}

fn default_streak_step() -> i64 {
    2
}

fn default_streak_cap() -> i64 {
    20
}

impl DailySettings {
    pub fn to_policy(&self) -> DailyPolicy {
        DailyPolicy {
            base_xp: self.base_xp,
            streak_step: self.streak_step,
            streak_cap: self.streak_cap,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load the global config, falling back to defaults when the file
    /// does not exist yet
    pub fn load() -> Result<Self> {
        let path = Self::global_config_path();
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Global PropQuest directory (~/.propquest)
    pub fn global_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".propquest")
    }

    /// Path of the global config file (~/.propquest/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_data_dir().join("config.toml")
    }

    /// Resolved database path (override or default location)
    pub fn db_path(&self) -> PathBuf {
        self.settings
            .db_path
            .clone()
            .unwrap_or_else(|| Self::global_data_dir().join("progression.db"))
    }

    /// Write the default config template to the global location
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let path = Self::global_config_path();
        if path.exists() && !force {
            anyhow::bail!("config already exists at {} (use --force)", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, DEFAULT_CONFIG_TOML)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Template written by `propquest init`
const DEFAULT_CONFIG_TOML: &str = r#"# PropQuest configuration

[settings]
# Override the progression database location
# db_path = "/var/lib/propquest/progression.db"

[settings.http]
# Port for the local JSON API
port = 9630
# Auth token clients must send in X-PROPQUEST-Token (empty disables auth)
token = ""

[settings.daily]
# Flat XP for a daily check-in
base_xp = 5
# Extra XP per streak day beyond the first, and its ceiling
streak_step = 2
streak_cap = 20
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.settings.http.port, 9630);
        assert_eq!(config.settings.daily.base_xp, 5);
        assert!(config.settings.db_path.is_none());
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.settings.http.port, 9630);
        assert_eq!(config.settings.daily.streak_cap, 20);
        assert!(config.settings.http.token.is_empty());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [settings.http]
            port = 7000
            token = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.http.port, 7000);
        assert_eq!(config.settings.http.token, "secret");
        // Untouched sections keep their defaults
        assert_eq!(config.settings.daily.streak_step, 2);
    }
}
