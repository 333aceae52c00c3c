//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bioguard_core::{DEFAULT_POLL_INTERVAL, LinkConfig, SessionConfig};
use bioguard_types::uuid::{ANALYZER_SERVICE, DEVICE_NAME, READING_CHARACTERISTIC};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Advertised name of the analyzer
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Primary service UUID
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,

    /// Reading characteristic UUID
    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: String,

    /// Poll period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to scan for the analyzer, in seconds
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,
}

fn default_device_name() -> String {
    DEVICE_NAME.to_string()
}

fn default_service_uuid() -> String {
    ANALYZER_SERVICE.to_string()
}

fn default_characteristic_uuid() -> String {
    READING_CHARACTERISTIC.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_scan_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            service_uuid: default_service_uuid(),
            characteristic_uuid: default_characteristic_uuid(),
            poll_interval_ms: default_poll_interval_ms(),
            scan_timeout_secs: default_scan_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            no_color: false,
        }
    }
}

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Device name from `--device` or `BIOGUARD_DEVICE`
    pub device: Option<String>,
    /// Poll interval in milliseconds
    pub interval_ms: Option<u64>,
    /// Connect timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bioguard")
            .join("config.toml")
    }

    /// Load config from the default location, or return defaults if missing
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = self.to_toml()?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Build the session configuration, applying overrides.
    ///
    /// Precedence: flag or environment, then this file, then defaults.
    pub fn session_config(&self, overrides: &Overrides) -> Result<SessionConfig> {
        let service = parse_uuid("service_uuid", &self.service_uuid)?;
        let characteristic = parse_uuid("characteristic_uuid", &self.characteristic_uuid)?;
        let device = overrides
            .device
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| self.device_name.clone());
        let interval = overrides.interval_ms.unwrap_or(self.poll_interval_ms);

        let config = SessionConfig::default()
            .device_name(device)
            .service_uuid(service)
            .characteristic_uuid(characteristic)
            .poll_interval(Duration::from_millis(interval))
            .scan_timeout(Duration::from_secs(self.scan_timeout_secs));
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Build the BLE link timeouts, applying overrides.
    pub fn link_config(&self, overrides: &Overrides) -> Result<LinkConfig> {
        let secs = overrides.timeout_secs.unwrap_or(self.connect_timeout_secs);
        let config = LinkConfig::default().connect_timeout(Duration::from_secs(secs));
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn parse_uuid(key: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).with_context(|| format!("Invalid {} '{}'", key, value))
}
