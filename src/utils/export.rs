//! Window and metrics export to CSV.
//!
//! Outputs per export round:
//! - `<source>_<sensor>.csv`: one file per sensor window: `index,t_offset_s,value`, oldest
//!   first, newest sample at `t_offset_s = 0`. The zero-padded source id keeps names unique
//!   even when display names repeat, and never collides with the fixed files below.
//! - `summary.csv`: one row per sensor: counters, wake-up lateness and acquisition time,
//!   window stats.
//! - `events.csv`: appended sampling events drained from the `EventRecorder`.
//!
//! Files are written to `<name>.tmp` then renamed, so readers never see a half-written window.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use log::info;
use serde::Serialize;

use crate::{
    error::ExportError,
    sampling::window_buffer::WindowSnapshot,
    utils::metrics::{EventRecorder, SamplerMetrics, calculate_stats, calculate_stats_u64},
};

#[derive(Debug, Serialize)]
struct WindowRow {
    index: usize,
    t_offset_s: f64,
    value: f64,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    source: usize,
    sensor: &'a str,
    label: &'a str,
    sampling_rate_hz: u64,
    window_samples: usize,
    valid_samples: usize,
    fired: u64,
    acquired: u64,
    acquisition_failures: u64,
    overruns: u64,
    late_wakeups: u64,
    max_lateness_us: u64,
    lateness_mean_us: Option<f64>,
    acquire_min_us: Option<f64>,
    acquire_mean_us: Option<f64>,
    acquire_max_us: Option<f64>,
    window_min: Option<f64>,
    window_max: Option<f64>,
    window_mean: Option<f64>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io { path: path.to_path_buf(), source }
}

/// File-system safe name for a sensor.
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "sensor".to_string() } else { stem }
}

/// `<source>_<stem>.csv`, unique per source id.
pub fn window_file_name(snapshot: &WindowSnapshot) -> String {
    format!("{:02}_{}.csv", snapshot.source, file_stem(&snapshot.name))
}

fn replace_atomically(tmp: &Path, dest: &Path) -> Result<(), ExportError> {
    fs::rename(tmp, dest).map_err(io_err(dest))
}

/// Writes one sensor window; tolerates partially filled windows.
pub fn export_window_csv(snapshot: &WindowSnapshot, dir: &Path) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(window_file_name(snapshot));
    let tmp = path.with_extension("csv.tmp");

    // header written explicitly so an empty window still yields a well-formed file
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&tmp)?;
    writer.write_record(["index", "t_offset_s", "value"])?;
    for (index, value) in snapshot.samples.iter().copied().enumerate() {
        writer.serialize(WindowRow {
            index,
            t_offset_s: snapshot.time_offset_s(index),
            value,
        })?;
    }
    writer.flush().map_err(io_err(&tmp))?;
    drop(writer);

    replace_atomically(&tmp, &path)?;
    Ok(path)
}

pub fn export_all_windows(
    snapshots: &[WindowSnapshot],
    dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    snapshots.iter().map(|s| export_window_csv(s, dir)).collect()
}

/// One row per sensor; each snapshot is matched to its metrics by source id.
pub fn export_summary_csv(
    snapshots: &[WindowSnapshot],
    metrics: &SamplerMetrics,
    path: &Path,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let tmp = path.with_extension("csv.tmp");
    let mut writer = csv::Writer::from_path(&tmp)?;

    for snap in snapshots {
        let Some(stats) = metrics.sensors.get(snap.source) else {
            continue;
        };
        let window = calculate_stats(&snap.samples);
        let lateness = calculate_stats_u64(&stats.lateness_us);
        let acquire = calculate_stats_u64(&stats.acquire_us);
        writer.serialize(SummaryRow {
            source: snap.source,
            sensor: &snap.name,
            label: &snap.label,
            sampling_rate_hz: snap.sampling_rate,
            window_samples: snap.window_length,
            valid_samples: snap.samples.len(),
            fired: stats.fired,
            acquired: stats.acquired,
            acquisition_failures: stats.acquisition_failures,
            overruns: stats.overruns,
            late_wakeups: stats.late_wakeups,
            max_lateness_us: stats.max_lateness_us,
            lateness_mean_us: lateness.as_ref().map(|s| s.mean),
            acquire_min_us: acquire.as_ref().map(|s| s.min),
            acquire_mean_us: acquire.as_ref().map(|s| s.mean),
            acquire_max_us: acquire.as_ref().map(|s| s.max),
            window_min: window.as_ref().map(|w| w.min),
            window_max: window.as_ref().map(|w| w.max),
            window_mean: window.as_ref().map(|w| w.mean),
        })?;
    }
    writer.flush().map_err(io_err(&tmp))?;
    drop(writer);

    replace_atomically(&tmp, path)
}

/// Appends queued events to `path`; writes the header when the file is new.
pub fn append_events_csv(events: &EventRecorder, path: &Path) -> Result<usize, ExportError> {
    if events.is_empty() {
        return Ok(0);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let file_exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err(path))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if !file_exists {
        writer.write_record(["sensor", "event", "ts_ns", "value"])?;
    }
    let n = events.drain_csv(&mut writer)?;
    if events.dropped() > 0 {
        info!("{} events dropped so far (queue full)", events.dropped());
    }
    Ok(n)
}
