//! # Station Configuration
//!
//! Settings for one fuel station deployment.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     FUEL_DB_PATH=/var/lib/fuel/fuel.db                                 │
//! │     FUEL_DEVICE_ID=pump-1                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/fuel-station/station.toml (Linux)                        │
//! │     ~/Library/Application Support/com.fuel.station/station.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     generated device_id, fuel.db in the platform data dir              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # station.toml
//! [station]
//! device_id = "pump-1"
//! name = "Highway 7"
//!
//! [database]
//! path = "/var/lib/fuel/fuel.db"
//! max_connections = 5
//!
//! [refuel]
//! reconcile_counter_on_create = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fuel_core::refuel::RefuelPolicy;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Identity of this station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSection {
    /// Tag written on every journal event.
    /// Auto-generated on first run if not provided.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Human-readable station name.
    #[serde(default = "default_station_name")]
    pub name: String,
}

fn default_device_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_station_name() -> String {
    "Fuel Station".to_string()
}

impl Default for StationSection {
    fn default() -> Self {
        StationSection {
            device_id: default_device_id(),
            name: default_station_name(),
        }
    }
}

/// Where the ledger lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "fuel", "station")
        .map(|dirs| dirs.data_dir().join("fuel.db"))
        .unwrap_or_else(|| PathBuf::from("fuel.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Refuel workflow behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefuelSection {
    /// Overwrite the stored counter with the reading keyed in at create
    /// time. When false, a mismatch rejects the refuel.
    #[serde(default = "default_true")]
    pub reconcile_counter_on_create: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RefuelSection {
    fn default() -> Self {
        RefuelSection {
            reconcile_counter_on_create: true,
        }
    }
}

// =============================================================================
// Station Configuration
// =============================================================================

/// Complete station configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default)]
    pub station: StationSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub refuel: RefuelSection,
}

impl StationConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (station.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading station config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load station config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, creating the parent directory.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Station config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.station.device_id.trim().is_empty() {
            return Err(ConfigError::Invalid("station.device_id is required".into()));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path is required".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `FUEL_*` overrides read through `var`.
    /// Unparseable numeric or boolean values are ignored with a warning.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("FUEL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(id) = var("FUEL_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.station.device_id = id;
        }

        if let Some(name) = var("FUEL_STATION_NAME") {
            self.station.name = name;
        }

        if let Some(value) = var("FUEL_RECONCILE_COUNTER") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.refuel.reconcile_counter_on_create = true,
                "0" | "false" | "no" | "off" => self.refuel.reconcile_counter_on_create = false,
                _ => warn!(value = %value, "Unknown FUEL_RECONCILE_COUNTER value"),
            }
        }

        if let Some(max) = var("FUEL_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Invalid FUEL_DB_MAX_CONNECTIONS value"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "fuel", "station")
            .map(|dirs| dirs.config_dir().join("station.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn device_id(&self) -> &str {
        &self.station.device_id
    }

    /// Refuel workflow settings derived from `[refuel]`.
    pub fn policy(&self) -> RefuelPolicy {
        RefuelPolicy {
            reconcile_counter: self.refuel.reconcile_counter_on_create,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
