//! Sampling metrics and event recording.
//!
//! Two independent paths:
//! - **SamplerMetrics:** per-sensor counters + bounded lateness history behind a mutex,
//!   read by the exporter for summary CSVs.
//! - **EventRecorder:** lock-free queue (16K capacity) of sampling events, drained to CSV
//!   by the exporter thread. Never blocks the sampling loop; drops when full.

use std::{
    collections::VecDeque,
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use serde::Serialize;

pub const MAX_POINTS: usize = 1_000;
const EVENT_QUEUE_CAPACITY: usize = 16_384;

/// Per-sensor counters.
#[derive(Debug, Default, Clone)]
pub struct SensorStats {
    pub name: String,
    pub fired: u64,
    pub acquired: u64,
    pub acquisition_failures: u64,
    /// Acquisitions that took longer than one period.
    pub overruns: u64,
    /// Wake-ups more than one period behind the due time.
    pub late_wakeups: u64,
    pub last_value: Option<f64>,
    pub max_lateness_us: u64,
    /// Wake-up lateness history (last `MAX_POINTS`)
    pub lateness_us: VecDeque<u64>,
    /// Acquisition duration history (last `MAX_POINTS`)
    pub acquire_us: VecDeque<u64>,
}

#[derive(Debug, Default, Clone)]
pub struct SamplerMetrics {
    pub sensors: Vec<SensorStats>,
    pub total_firings: u64,
}

impl SamplerMetrics {
    pub fn with_sensors<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            sensors: names
                .into_iter()
                .map(|name| SensorStats {
                    name: name.to_string(),
                    ..SensorStats::default()
                })
                .collect(),
            total_firings: 0,
        }
    }

    pub fn record_firing(&mut self, source: usize, lateness: Duration, period: Duration) -> bool {
        self.total_firings += 1;
        let Some(s) = self.sensors.get_mut(source) else {
            return false;
        };
        let lateness_us = lateness.as_micros() as u64;
        s.fired += 1;
        s.max_lateness_us = s.max_lateness_us.max(lateness_us);
        push_capped_u64(&mut s.lateness_us, lateness_us);
        let late = lateness > period;
        if late {
            s.late_wakeups += 1;
        }
        late
    }

    pub fn record_sample(
        &mut self,
        source: usize,
        value: f64,
        took: Duration,
        period: Duration,
    ) -> bool {
        let Some(s) = self.sensors.get_mut(source) else {
            return false;
        };
        s.acquired += 1;
        s.last_value = Some(value);
        push_capped_u64(&mut s.acquire_us, took.as_micros() as u64);
        let overrun = took > period;
        if overrun {
            s.overruns += 1;
        }
        overrun
    }

    pub fn record_failure(&mut self, source: usize) {
        if let Some(s) = self.sensors.get_mut(source) {
            s.acquisition_failures += 1;
        }
    }

    pub fn total_failures(&self) -> u64 {
        self.sensors.iter().map(|s| s.acquisition_failures).sum()
    }
}

pub type SharedMetrics = Arc<Mutex<SamplerMetrics>>;

/// Appends value to metrics buffer; removes oldest if at capacity.
#[inline]
pub fn push_capped_u64(buf: &mut VecDeque<u64>, val: u64) {
    if buf.len() >= MAX_POINTS {
        buf.pop_front();
    }
    buf.push_back(val);
}

/// Statistics summary for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

/// Computes min, max, mean over any float sequence (e.g. a window slice).
pub fn calculate_stats(data: &[f64]) -> Option<Stats> {
    if data.is_empty() {
        return None;
    }

    let count = data.len();
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mean = data.iter().sum::<f64>() / count as f64;

    Some(Stats { min, max, mean, count })
}

/// Computes min, max, mean for u64 buffer (cast to f64).
pub fn calculate_stats_u64(data: &VecDeque<u64>) -> Option<Stats> {
    if data.is_empty() {
        return None;
    }

    let count = data.len();
    let min = data.iter().map(|&x| x as f64).fold(f64::INFINITY, f64::min);
    let max = data.iter().map(|&x| x as f64).fold(f64::NEG_INFINITY, f64::max);
    let mean = data.iter().map(|&x| x as f64).sum::<f64>() / count as f64;

    Some(Stats { min, max, mean, count })
}

/// Sampling lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Due time elapsed; `lateness_ns` is wake-up delay past the due time.
    Fired { sensor: usize, ts_ns: u64, lateness_ns: u64 },
    Acquired { sensor: usize, ts_ns: u64, value: f64 },
    AcquisitionFailed { sensor: usize, ts_ns: u64, reason: String },
    Overrun { sensor: usize, ts_ns: u64, took_ns: u64 },
}

#[derive(Debug, Serialize)]
pub struct EventRow {
    pub sensor: usize,
    pub event: &'static str,
    pub ts_ns: u64,
    pub value: String,
}

impl Event {
    pub fn to_row(&self) -> EventRow {
        match self {
            Event::Fired { sensor, ts_ns, lateness_ns } => EventRow {
                sensor: *sensor,
                event: "fired",
                ts_ns: *ts_ns,
                value: lateness_ns.to_string(),
            },
            Event::Acquired { sensor, ts_ns, value } => EventRow {
                sensor: *sensor,
                event: "acquired",
                ts_ns: *ts_ns,
                value: value.to_string(),
            },
            Event::AcquisitionFailed { sensor, ts_ns, reason } => EventRow {
                sensor: *sensor,
                event: "acquisition_failed",
                ts_ns: *ts_ns,
                value: reason.clone(),
            },
            Event::Overrun { sensor, ts_ns, took_ns } => EventRow {
                sensor: *sensor,
                event: "overrun",
                ts_ns: *ts_ns,
                value: took_ns.to_string(),
            },
        }
    }
}

/// Non-blocking event recorder.
///
/// `record()` pushes to a bounded lock-free queue and returns immediately; events are
/// dropped (and counted) when the queue is full. `drain_csv()` empties it into a writer.
#[derive(Clone)]
pub struct EventRecorder {
    queue: Arc<ArrayQueue<Event>>,
    dropped: Arc<AtomicU64>,
    run_start: Instant,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
            dropped: Arc::new(AtomicU64::new(0)),
            run_start: Instant::now(),
        }
    }

    #[inline]
    pub fn record(&self, event: Event) {
        if self.queue.push(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Nanoseconds since recorder creation.
    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.run_start.elapsed().as_nanos() as u64
    }

    /// Nanoseconds between recorder creation and `at`.
    pub fn ts_ns(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.run_start).as_nanos() as u64
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pop(&self) -> Option<Event> {
        self.queue.pop()
    }

    /// Drains every queued event as CSV rows (no header). Returns rows written.
    pub fn drain_csv<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<usize, csv::Error> {
        let mut n = 0;
        while let Some(event) = self.queue.pop() {
            writer.serialize(event.to_row())?;
            n += 1;
        }
        writer.flush()?;
        Ok(n)
    }
}
