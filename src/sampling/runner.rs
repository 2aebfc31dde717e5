//! runner.rs
//! The sampling loop: wait for the earliest due time → fire → sample → record, until
//! shutdown.
//!
//! - Real-time scheduling: due times come from `PeriodicScheduler` on a fixed grid
//! - Failures: an acquisition error is counted, logged and recorded; the source keeps its slot
//!   on the grid and every other source is unaffected
//! - Overruns: an acquisition slower than the source's period is reported, never compensated

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::{
    advanced::exporter::ExportTarget,
    config::SamplerConfig,
    error::{ConfigError, SchedulingError},
    sampling::{
        clock::{Clock, Shutdown, SystemClock},
        scheduler::{Firing, PeriodicScheduler, Tick},
        sensor::{SensorSource, SharedSensor},
        window_buffer::WindowSnapshot,
    },
    utils::metrics::{Event, EventRecorder, SamplerMetrics, SharedMetrics},
};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStatus {
    pub firings: u64,
    pub acquisition_failures: u64,
    pub cancelled: bool,
}

/// What happened on one firing.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Acquired(f64),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub firing: Firing,
    pub outcome: SampleOutcome,
}

pub struct Sampler<C: Clock = SystemClock> {
    sensors: Vec<SharedSensor>,
    scheduler: PeriodicScheduler,
    clock: C,
    metrics: SharedMetrics,
    events: EventRecorder,
}

impl Sampler<SystemClock> {
    /// Builds file-backed sensors for every enabled entry and schedules them on the system clock.
    ///
    /// All sensors are constructed before any is registered, so a bad entry leaves nothing behind.
    pub fn from_config(cfg: &SamplerConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let sensors = cfg
            .enabled_sensors()
            .map(|(_, s)| SensorSource::from_config(s, cfg.sampling_window))
            .collect::<Result<Vec<_>, _>>()?;

        let rt = &cfg.runtime;
        let clock =
            SystemClock::new(rt.spin_threshold_us, Duration::from_millis(rt.shutdown_poll_ms));
        let start = clock.now() + Duration::from_millis(rt.startup_delay_ms);

        Self::with_clock(sensors, clock, start).map_err(|e| match e {
            SchedulingError::InvalidPeriod { source_id, .. } => ConfigError::InvalidRate {
                sensor: cfg
                    .enabled_sensors()
                    .nth(source_id)
                    .map(|(id, _)| id.to_string())
                    .unwrap_or_default(),
            },
            _ => ConfigError::NoSensors,
        })
    }
}

impl<C: Clock> Sampler<C> {
    /// Registers every sensor (index = source id) with its first due time at `start`.
    pub fn with_clock(
        mut sensors: Vec<SensorSource>,
        clock: C,
        start: Instant,
    ) -> Result<Self, SchedulingError> {
        let mut scheduler = PeriodicScheduler::new();
        for (id, sensor) in sensors.iter_mut().enumerate() {
            scheduler.register(id, sensor.sampling_rate(), start)?;
            sensor.assign_source(id);
            info!(
                "Registered sensor {} '{}' at {} Hz, {} samples/window, source {}",
                id,
                sensor.name(),
                sensor.sampling_rate(),
                sensor.samples_in_window(),
                sensor.locator()
            );
        }

        let metrics = SamplerMetrics::with_sensors(sensors.iter().map(|s| s.name()));
        Ok(Self {
            sensors: sensors.into_iter().map(SensorSource::into_shared).collect(),
            scheduler,
            clock,
            metrics: Arc::new(Mutex::new(metrics)),
            events: EventRecorder::new(),
        })
    }

    /// One scheduler tick plus the sampling it triggers. `None` on cancellation.
    pub fn step(&mut self, shutdown: &Shutdown) -> Result<Option<StepReport>, SchedulingError> {
        let firing = match self.scheduler.run_once_blocking(&self.clock, shutdown)? {
            Tick::Fired(f) => f,
            Tick::Cancelled => return Ok(None),
        };
        // Bookkeeping for this firing is already done; sampling below cannot shift the grid.

        let woke = self.clock.now();
        let lateness = woke.saturating_duration_since(firing.due);
        let source = firing.source;
        let sensor = self
            .sensors
            .get(source)
            .ok_or(SchedulingError::UnknownSource(source))?;

        self.events.record(Event::Fired {
            sensor: source,
            ts_ns: self.events.ts_ns(firing.due),
            lateness_ns: lateness.as_nanos() as u64,
        });

        let result = sensor.lock().sample();
        let took = self.clock.now().saturating_duration_since(woke);

        let mut m = self.metrics.lock();
        if m.record_firing(source, lateness, firing.period) {
            warn!(
                "[sensor {}] woke {:?} after due time (period {:?})",
                source, lateness, firing.period
            );
        }

        let outcome = match result {
            Ok(value) => {
                self.events.record(Event::Acquired {
                    sensor: source,
                    ts_ns: self.events.now_ns(),
                    value,
                });
                if m.record_sample(source, value, took, firing.period) {
                    warn!(
                        "[sensor {}] acquisition overran its period: {:?} > {:?}",
                        source, took, firing.period
                    );
                    self.events.record(Event::Overrun {
                        sensor: source,
                        ts_ns: self.events.now_ns(),
                        took_ns: took.as_nanos() as u64,
                    });
                }
                SampleOutcome::Acquired(value)
            }
            Err(e) => {
                m.record_failure(source);
                warn!("[sensor {}] acquisition failed: {}", source, e);
                let reason = e.to_string();
                self.events.record(Event::AcquisitionFailed {
                    sensor: source,
                    ts_ns: self.events.now_ns(),
                    reason: reason.clone(),
                });
                SampleOutcome::Failed(reason)
            }
        };

        Ok(Some(StepReport { firing, outcome }))
    }

    /// Runs until `shutdown` is triggered.
    pub fn run(&mut self, shutdown: &Shutdown) -> Result<RunStatus, SchedulingError> {
        self.run_bounded(shutdown, None)
    }

    /// Runs at most `max_firings` ticks (or until shutdown).
    pub fn run_for_firings(
        &mut self,
        shutdown: &Shutdown,
        max_firings: u64,
    ) -> Result<RunStatus, SchedulingError> {
        self.run_bounded(shutdown, Some(max_firings))
    }

    fn run_bounded(
        &mut self,
        shutdown: &Shutdown,
        max_firings: Option<u64>,
    ) -> Result<RunStatus, SchedulingError> {
        let mut status = RunStatus::default();
        info!("[Sampler] running {} sensors", self.sensors.len());

        while max_firings.is_none_or(|max| status.firings < max) {
            match self.step(shutdown)? {
                Some(report) => {
                    status.firings += 1;
                    if let SampleOutcome::Failed(_) = report.outcome {
                        status.acquisition_failures += 1;
                    }
                }
                None => {
                    status.cancelled = true;
                    break;
                }
            }
        }

        debug!("[Sampler] stopped: {:?}", status);
        Ok(status)
    }

    pub fn sensors(&self) -> &[SharedSensor] {
        &self.sensors
    }

    pub fn sensor(&self, source: usize) -> Option<&SharedSensor> {
        self.sensors.get(source)
    }

    pub fn snapshots(&self) -> Vec<WindowSnapshot> {
        self.sensors.iter().map(|s| s.lock().snapshot()).collect()
    }

    pub fn scheduler(&self) -> &PeriodicScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    pub fn events(&self) -> EventRecorder {
        self.events.clone()
    }

    /// Handles the exporter needs to read this sampler's windows from another thread.
    pub fn export_target(&self, dir: impl Into<PathBuf>) -> ExportTarget {
        ExportTarget {
            sensors: self.sensors.clone(),
            metrics: self.metrics.clone(),
            events: self.events.clone(),
            dir: dir.into(),
        }
    }
}
