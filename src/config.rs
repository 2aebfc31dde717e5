//! Configuration loading and validation.
//!
//! ```json
//! {
//!   "sampling_window": 10,
//!   "sensors": {
//!     "cpu_temp": {
//!       "sampling_rate": 10, "name": "CPU", "label": "°C",
//!       "min_value": 0.0, "max_value": 110.0,
//!       "enabled": true, "path": "/sys/class/thermal/thermal_zone0/temp", "scale": 0.001
//!     },
//!     "demo": {
//!       "sampling_rate": 5, "name": "Demo", "label": "V",
//!       "min_value": 0.0, "max_value": 10.0,
//!       "enabled": true, "simulated": { "base": 5.0, "noise": 0.5, "seed": 7 }
//!     }
//!   },
//!   "runtime": { "startup_delay_ms": 100, "export_interval_ms": 1000 }
//! }
//! ```
//!
//! Sensors are keyed by id and kept in a `BTreeMap`, so registration order is the key order.
//! A sensor reads `path` unless it carries a `simulated` block, which takes precedence.

use std::{collections::BTreeMap, fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, sampling::scheduler::period_for_rate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Seconds of history kept for every sensor.
    pub sampling_window: u64,
    pub sensors: BTreeMap<String, SensorConfig>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Hz
    pub sampling_rate: u64,
    pub name: String,
    pub label: String,
    pub min_value: f64,
    pub max_value: f64,
    pub enabled: bool,
    /// Value file; required unless `simulated` is set.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated: Option<SimulatedConfig>,
}

/// `base ± noise`, uniformly distributed, from a seeded generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedConfig {
    pub base: f64,
    pub noise: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Offset of every sensor's first due time from startup.
    pub startup_delay_ms: u64,
    /// Longest uninterrupted sleep before the shutdown flag is re-checked.
    pub shutdown_poll_ms: u64,
    /// Native sleep accuracy for `spin_sleep`; the remainder is spun.
    pub spin_threshold_us: u32,
    /// Pin the sampling thread to this core.
    pub pin_core: Option<usize>,
    /// Run the sampling thread at `ThreadPriority::Max`.
    pub max_priority: bool,
    pub export_interval_ms: u64,
    pub export_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 100,
            shutdown_poll_ms: 20,
            spin_threshold_us: 100,
            pin_core: None,
            max_priority: false,
            export_interval_ms: 1_000,
            export_dir: "data/windows".to_string(),
        }
    }
}

fn default_scale() -> f64 {
    1.0
}

impl SamplerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: SamplerConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Enabled sensors in registration order.
    pub fn enabled_sensors(&self) -> impl Iterator<Item = (&str, &SensorConfig)> {
        self.sensors
            .iter()
            .filter(|(_, s)| s.enabled)
            .map(|(id, s)| (id.as_str(), s))
    }

    /// Checks everything a sensor needs before anything is registered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_window == 0 {
            return Err(ConfigError::InvalidWindow);
        }

        let mut enabled = 0usize;
        for (id, sensor) in self.enabled_sensors() {
            enabled += 1;
            if period_for_rate(sensor.sampling_rate).is_none() {
                return Err(ConfigError::InvalidRate { sensor: id.to_string() });
            }
            if sensor
                .sampling_rate
                .checked_mul(self.sampling_window)
                .and_then(|n| n.checked_mul(2))
                .and_then(|n| usize::try_from(n).ok())
                .is_none()
            {
                return Err(ConfigError::WindowTooLarge {
                    sensor: id.to_string(),
                    rate: sensor.sampling_rate,
                    window: self.sampling_window,
                });
            }
            if sensor.name.trim().is_empty() {
                return Err(ConfigError::EmptyField { sensor: id.to_string(), field: "name" });
            }
            if sensor.simulated.is_none() && sensor.path.trim().is_empty() {
                return Err(ConfigError::EmptyField { sensor: id.to_string(), field: "path" });
            }
        }

        if enabled == 0 {
            return Err(ConfigError::NoSensors);
        }
        Ok(())
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Reads, parses and validates a JSON configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SamplerConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = SamplerConfig::from_json_str(&text)?;
    info!(
        "Loaded {:?}: window {} s, {} of {} sensors enabled",
        path,
        cfg.sampling_window,
        cfg.enabled_sensors().count(),
        cfg.sensors.len()
    );
    Ok(cfg)
}
