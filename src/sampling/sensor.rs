//! sensor.rs
//! A sampled sensor: display metadata + sampling configuration + its window buffer.
//!
//! `sample()` is the only mutating path. A failed acquisition returns the error and
//! leaves the buffer exactly as it was.

use std::{fmt, sync::Arc};

use log::debug;
use parking_lot::Mutex;

use crate::{
    config::SensorConfig,
    error::{AcquisitionError, ConfigError},
    sampling::{
        acquisition::{Acquire, FileSource, SimulatedSource},
        window_buffer::{SampleWindowBuffer, WindowSnapshot, WindowView},
    },
};

/// Sensor shared between the sampling loop and the exporter.
pub type SharedSensor = Arc<Mutex<SensorSource>>;

/// Display metadata. Bounds are informational and never enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMeta {
    pub name: String,
    pub label: String,
    pub min_value: f64,
    pub max_value: f64,
}

pub struct SensorSource {
    source: usize,
    meta: SensorMeta,
    sampling_rate: u64,
    sampling_window: u64,
    buffer: SampleWindowBuffer,
    acquirer: Box<dyn Acquire>,
}

impl SensorSource {
    /// Builds a sensor with `sampling_rate * sampling_window` samples of history.
    pub fn new(
        meta: SensorMeta,
        sampling_rate: u64,
        sampling_window: u64,
        acquirer: Box<dyn Acquire>,
    ) -> Result<Self, ConfigError> {
        if sampling_window == 0 {
            return Err(ConfigError::InvalidWindow);
        }
        if sampling_rate == 0 {
            return Err(ConfigError::InvalidRate { sensor: meta.name });
        }
        let samples_in_window = sampling_rate
            .checked_mul(sampling_window)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| n.checked_mul(2).is_some())
            .ok_or_else(|| ConfigError::WindowTooLarge {
                sensor: meta.name.clone(),
                rate: sampling_rate,
                window: sampling_window,
            })?;

        Ok(Self {
            source: 0,
            meta,
            sampling_rate,
            sampling_window,
            buffer: SampleWindowBuffer::new(samples_in_window),
            acquirer,
        })
    }

    /// Builds a file-backed sensor from one configuration entry.
    pub fn from_config(cfg: &SensorConfig, sampling_window: u64) -> Result<Self, ConfigError> {
        let meta = SensorMeta {
            name: cfg.name.clone(),
            label: cfg.label.clone(),
            min_value: cfg.min_value,
            max_value: cfg.max_value,
        };
        let acquirer: Box<dyn Acquire> = match &cfg.simulated {
            Some(sim) => Box::new(SimulatedSource::new(&cfg.name, sim.base, sim.noise, sim.seed)),
            None => Box::new(FileSource::new(&cfg.path).with_scale(cfg.scale)),
        };
        Self::new(meta, cfg.sampling_rate, sampling_window, acquirer)
    }

    pub fn into_shared(self) -> SharedSensor {
        Arc::new(Mutex::new(self))
    }

    /// Acquires one value and appends it; the buffer is untouched on failure.
    pub fn sample(&mut self) -> Result<f64, AcquisitionError> {
        let value = self.acquirer.acquire()?;
        self.buffer.append(value);
        debug!("[{}] read {} {}", self.meta.name, value, self.meta.label);
        Ok(value)
    }

    pub fn read_window(&self) -> WindowView<'_> {
        self.buffer.read_window()
    }

    /// Copy of the window for consumers that must not hold the lock.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            source: self.source,
            name: self.meta.name.clone(),
            label: self.meta.label.clone(),
            sampling_rate: self.sampling_rate,
            min_value: self.meta.min_value,
            max_value: self.meta.max_value,
            window_length: self.buffer.window_length(),
            samples: self.buffer.read_window().to_snapshot(),
        }
    }

    /// Source id assigned at registration (0 until registered).
    pub fn source(&self) -> usize {
        self.source
    }

    pub(crate) fn assign_source(&mut self, source: usize) {
        self.source = source;
    }

    pub fn meta(&self) -> &SensorMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn label(&self) -> &str {
        &self.meta.label
    }

    pub fn min_value(&self) -> f64 {
        self.meta.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.meta.max_value
    }

    /// Hz
    pub fn sampling_rate(&self) -> u64 {
        self.sampling_rate
    }

    /// Seconds
    pub fn sampling_window(&self) -> u64 {
        self.sampling_window
    }

    pub fn samples_in_window(&self) -> usize {
        self.buffer.window_length()
    }

    pub fn valid_count(&self) -> usize {
        self.buffer.valid_count()
    }

    pub fn locator(&self) -> String {
        self.acquirer.describe()
    }
}

impl fmt::Debug for SensorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorSource")
            .field("source", &self.source)
            .field("meta", &self.meta)
            .field("sampling_rate", &self.sampling_rate)
            .field("sampling_window", &self.sampling_window)
            .field("valid_count", &self.buffer.valid_count())
            .field("locator", &self.acquirer.describe())
            .finish()
    }
}
