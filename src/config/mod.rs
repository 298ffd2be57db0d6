//! Monitor configuration
//!
//! TOML-backed settings for the serial link, the model artifact, escalation
//! and the consumer cadence. Resolution order, first hit wins:
//!
//! 1. file named by `$POSTURE_CONFIG`
//! 2. `./posture_config.toml`
//! 3. [`defaults`]
//!
//! The process installs one resolved config with [`init`] and reads it back
//! through [`get`].

mod monitor_config;
pub mod defaults;

pub use monitor_config::*;

use std::sync::OnceLock;

static MONITOR_CONFIG: OnceLock<MonitorConfig> = OnceLock::new();

/// Install the process-wide config and return the one in effect.
///
/// Only the first call installs; a later call logs a warning and the
/// returned reference is still the original config.
pub fn init(config: MonitorConfig) -> &'static MonitorConfig {
    let mut installed = false;
    let active = MONITOR_CONFIG.get_or_init(|| {
        installed = true;
        config
    });
    if !installed {
        tracing::warn!("config::init() called after the config was installed, keeping the first");
    }
    active
}

/// The installed config, or built-in defaults if nothing was installed.
pub fn get() -> &'static MonitorConfig {
    MONITOR_CONFIG.get_or_init(MonitorConfig::default)
}
