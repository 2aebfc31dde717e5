//! # rts_sampler
//!
//! Multi-rate periodic sensor sampler with per-sensor sliding windows.
//!
//! ## Key Architecture
//! - **SampleWindowBuffer:** mirrored `2·W` array; the last `W` samples are always one
//!   contiguous slice (`read_window()`), no wraparound for readers.
//! - **SensorSource:** window + rate/metadata + an `Acquire` capability; `sample()` never
//!   touches the buffer on failure.
//! - **PeriodicScheduler:** min-heap of due times, fixed-grid rescheduling (`due += period`).
//! - **Sampler:** single-threaded loop with one cancellable suspension point.
//!
//! ## Concurrency
//! - Sensors are `Arc<parking_lot::Mutex<_>>`; the exporter copies windows out under the lock
//!   and does its I/O after releasing it.
//! - `Shutdown` (atomic flag) stops both the sampling loop and the exporter.

pub mod advanced;
pub mod config;
pub mod error;
pub mod sampling;
pub mod utils;

pub use config::{RuntimeConfig, SamplerConfig, SensorConfig, SimulatedConfig, load_config};
pub use error::{AcquisitionError, ConfigError, ExportError, SchedulingError};
pub use sampling::{
    acquisition::{Acquire, FileSource, SimulatedSource},
    clock::{Clock, Shutdown, SimulatedClock, SystemClock, WaitOutcome},
    runner::{RunStatus, SampleOutcome, Sampler, StepReport},
    scheduler::{Firing, PeriodicScheduler, ScheduleEntry, Tick, period_for_rate},
    sensor::{SensorMeta, SensorSource, SharedSensor},
    window_buffer::{SampleWindowBuffer, WindowSnapshot, WindowView},
};
