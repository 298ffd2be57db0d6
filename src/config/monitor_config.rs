//! Monitor Configuration - serial link, model artifact and timing as TOML values
//!
//! Each struct implements `Default` with values from [`super::defaults`], so a
//! deployment with no config file behaves like the stock rig.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "POSTURE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "posture_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitor deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$POSTURE_CONFIG` env var
/// 2. `./posture_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub consumer: ConsumerConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order.
    ///
    /// A file that exists but fails to load is logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Monitor config saved");
        Ok(())
    }

    /// Validate every section, collecting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.serial;
        if s.port.trim().is_empty() {
            errors.push("serial.port must not be empty".to_string());
        }
        if s.baud_rate == 0 {
            errors.push("serial.baud_rate must be > 0".to_string());
        }
        if s.read_timeout_ms == 0 {
            errors.push("serial.read_timeout_ms must be > 0".to_string());
        }

        if self.classifier.model_path.as_os_str().is_empty() {
            errors.push("classifier.model_path must not be empty".to_string());
        }

        Self::check_positive_secs(
            self.escalation.sustained_threshold_secs,
            "escalation.sustained_threshold_secs",
            &mut errors,
        );

        if self.consumer.poll_interval_ms == 0 {
            errors.push("consumer.poll_interval_ms must be > 0".to_string());
        }
        Self::check_positive_secs(
            self.consumer.stale_warning_secs,
            "consumer.stale_warning_secs",
            &mut errors,
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive_secs(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN fails every comparison, check it first
        if !value.is_finite() {
            errors.push(format!("{name} must be finite (got {value})"));
        } else if value <= 0.0 {
            errors.push(format!("{name} must be > 0 (got {value})"));
        } else if Duration::try_from_secs_f64(value).is_err() {
            // Would overflow Duration::from_secs_f64 in the accessors
            errors.push(format!("{name} is too large (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Serial Link
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyACM0` or `COM3`
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Wait after opening before reading (board reset transient)
    pub settle_delay_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: defaults::SERIAL_PORT.to_string(),
            baud_rate: defaults::SERIAL_BAUD_RATE,
            read_timeout_ms: defaults::SERIAL_READ_TIMEOUT_MS,
            settle_delay_ms: defaults::SERIAL_SETTLE_DELAY_MS,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path to the JSON logistic model artifact
    pub model_path: PathBuf,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::MODEL_PATH),
        }
    }
}

// ============================================================================
// Escalation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Continuous dangerous time before `DangerousSustained` (inclusive)
    pub sustained_threshold_secs: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            sustained_threshold_secs: defaults::SUSTAINED_DANGER_THRESHOLD_SECS,
        }
    }
}

impl EscalationConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs_f64(self.sustained_threshold_secs)
    }
}

// ============================================================================
// Consumer Loop
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    pub poll_interval_ms: u64,
    /// Log a warning after this long without a new reading (severity unaffected)
    pub stale_warning_secs: f64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            stale_warning_secs: defaults::STALE_WARNING_SECS,
        }
    }
}

impl ConsumerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_warning(&self) -> Duration {
        Duration::from_secs_f64(self.stale_warning_secs)
    }
}
