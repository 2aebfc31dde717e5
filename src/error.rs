//! Error taxonomy for the sampler.
//!
//! - **ConfigError:** raised while loading/validating configuration, before any sensor is
//!   registered.
//! - **AcquisitionError:** one failed read from a sensor; recoverable, the buffer is left
//!   untouched.
//! - **SchedulingError:** programming errors around the periodic scheduler (bad period, empty
//!   heap).
//! - **ExportError:** window/metrics export failures (CSV, SVG).

use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("sampling_window must be a positive number of seconds")]
    InvalidWindow,
    #[error("sensor '{sensor}': sampling_rate must be a positive number of Hz")]
    InvalidRate { sensor: String },
    #[error("sensor '{sensor}': {rate} Hz x {window} s overflows the sample buffer")]
    WindowTooLarge { sensor: String, rate: u64, window: u64 },
    #[error("sensor '{sensor}': field '{field}' must not be empty")]
    EmptyField { sensor: String, field: &'static str },
    #[error("no enabled sensors in configuration")]
    NoSensors,
}

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path:?} contains no value")]
    Empty { path: PathBuf },
    #[error("{path:?}: cannot parse '{token}' as a number")]
    Parse { path: PathBuf, token: String },
    #[error("acquired non-finite value {0}")]
    NonFinite(f64),
    #[error("{0}")]
    Device(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("source {source_id}: period must be positive (rate {rate} Hz)")]
    InvalidPeriod { source_id: usize, rate: u64 },
    #[error("source {0} is already registered")]
    Duplicate(usize),
    #[error("source {0} is not registered")]
    UnknownSource(usize),
    #[error("scheduler has no registered sources")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ExportError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ExportError::Plot(format!("{value:?}"))
    }
}
