//! Configuration management for nabud.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{DEFAULT_CYCLE_DIR, DEFAULT_ORIGIN};

/// Main configuration structure.
///
/// Every field has a default matching the adapter's built-ins, so an empty
/// file and a missing file behave identically. Command-line arguments
/// override file values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Serial link configuration.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Packet store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP origin configuration.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Create example configuration.
    pub fn example() -> Self {
        Self {
            serial: SerialConfig {
                device: Some("/dev/ttyUSB0".into()),
            },
            ..Default::default()
        }
    }
}

/// Serial link configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device connected to the NABU.
    pub device: Option<String>,
}

/// Packet store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding cycle containers.
    #[serde(default = "default_cycle_dir")]
    pub cycle_dir: PathBuf,
}

fn default_cycle_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CYCLE_DIR)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cycle_dir: default_cycle_dir(),
        }
    }
}

/// HTTP origin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Download missing containers from the origin.
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,

    /// Origin as `host[:port][/path]`, without a scheme.
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_http_enabled() -> bool {
    true
}
fn default_origin() -> String {
    DEFAULT_ORIGIN.into()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            origin: default_origin(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable colored output.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: default_color(),
        }
    }
}

/// Initialize logging.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(config.color))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtins() {
        let config = Config::default();
        assert_eq!(config.store.cycle_dir, PathBuf::from("cycle"));
        assert_eq!(config.http.origin, DEFAULT_ORIGIN);
        assert!(config.http.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn empty_file_equals_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.store.cycle_dir, Config::default().store.cycle_dir);
        assert_eq!(config.http.origin, Config::default().http.origin);
    }

    #[test]
    fn example_round_trips_through_toml() {
        let example = Config::example();
        let text = toml::to_string_pretty(&example).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.serial.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(parsed.http.origin, example.http.origin);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [http]
            origin = "cycles.example.net/alt"
            "#,
        )
        .unwrap();
        assert_eq!(config.http.origin, "cycles.example.net/alt");
        assert!(config.http.enabled);
        assert_eq!(config.store.cycle_dir, PathBuf::from("cycle"));
    }
}
