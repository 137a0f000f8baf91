//! # csapp Boot Configuration
//!
//! [`BootConfig`] gathers every tunable the bootstrap sequence reads: which
//! local service to connect to and how long to wait, driver sizing, console
//! logging, and the behavior of the in-process server used on hosted targets.
//!
//! Files are JSON, or TOML / YAML behind the `toml-config` / `yaml-config`
//! features; the format is chosen from the file extension.
pub mod error;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::ipc::{Device, ServiceId};
use crate::kernel::constants;

pub use error::ConfigError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Connection to the local system server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub service_id: u32,
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_id: constants::PRIMARY_LOCAL_SERVICE_ID,
            connect_timeout_ms: constants::DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    pub pin_count: u8,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self { pin_count: constants::DEFAULT_PIN_COUNT }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    /// Timers one process may have armed at once
    pub max_timers: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { max_timers: constants::DEFAULT_MAX_TIMERS }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Tag written in front of every console line
    pub prefix: String,
    /// Lowest level forwarded to the console (`off`, `error` .. `trace`)
    pub level: String,
}

impl LoggingConfig {
    /// Console level; an unparsable value (only possible without validation) means `info`
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.level).unwrap_or(LevelFilter::Info)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            prefix: constants::DEFAULT_LOG_PREFIX.to_string(),
            level: constants::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Behavior of the in-process local server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    pub refuse_connections: bool,
    pub failing_devices: Vec<Device>,
    pub echo_console: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            refuse_connections: false,
            failing_devices: Vec::new(),
            echo_console: true,
        }
    }
}

/// Complete boot configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootConfig {
    pub server: ServerConfig,
    pub gpio: GpioConfig,
    pub timer: TimerConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorConfig,
}

impl BootConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, format)?;
        log::info!("Loaded boot configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| ConfigError::deserialization(format.extension(), e))?,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| ConfigError::deserialization(format.extension(), e))?,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| ConfigError::deserialization(format.extension(), e))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| ConfigError::serialization(format.extension(), e)),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| ConfigError::serialization(format.extension(), e)),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::serialization(format.extension(), e)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.service_id == 0 {
            return Err(ConfigError::invalid("server.service_id", "service id 0 is reserved"));
        }
        if self.server.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid("server.connect_timeout_ms", "must be greater than zero"));
        }
        if self.gpio.pin_count == 0 {
            return Err(ConfigError::invalid("gpio.pin_count", "must be greater than zero"));
        }
        if self.timer.max_timers == 0 {
            return Err(ConfigError::invalid("timer.max_timers", "must be greater than zero"));
        }
        if LevelFilter::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("unknown level '{}'", self.logging.level),
            ));
        }
        Ok(())
    }

    pub fn service(&self) -> ServiceId {
        ServiceId(self.server.service_id)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.connect_timeout_ms)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.logging.level_filter()
    }
}
