//! Background window exporter.
//!
//! Every `interval` the exporter takes a copy-on-read snapshot of each sensor window (holding a
//! sensor's lock only for the copy), then writes CSVs, the summary, the event log and an SVG
//! without holding any lock. The sampling thread is never blocked on disk I/O.
//! A final round runs after shutdown so the last window always lands on disk.

use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crossbeam::channel::{self, Receiver};
use log::{error, info};

use crate::{
    advanced::plot::render_windows_svg,
    error::ExportError,
    sampling::{clock::Shutdown, sensor::SharedSensor, window_buffer::WindowSnapshot},
    utils::{
        export::{append_events_csv, export_all_windows, export_summary_csv},
        metrics::{EventRecorder, SharedMetrics},
    },
};

/// Everything one export round needs.
#[derive(Clone)]
pub struct ExportTarget {
    pub sensors: Vec<SharedSensor>,
    pub metrics: SharedMetrics,
    pub events: EventRecorder,
    pub dir: PathBuf,
}

impl ExportTarget {
    pub fn snapshots(&self) -> Vec<WindowSnapshot> {
        self.sensors.iter().map(|s| s.lock().snapshot()).collect()
    }

    /// One export round. Returns the number of window files written.
    pub fn export_once(&self) -> Result<usize, ExportError> {
        let snapshots = self.snapshots();
        let metrics = self.metrics.lock().clone();

        let written = export_all_windows(&snapshots, &self.dir)?;
        export_summary_csv(&snapshots, &metrics, &self.dir.join("summary.csv"))?;
        append_events_csv(&self.events, &self.dir.join("events.csv"))?;
        render_windows_svg(&snapshots, &self.dir.join("windows.svg"))?;
        Ok(written.len())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Spawns the periodic exporter; it exits after a final export once `shutdown` triggers.
pub fn spawn_exporter(
    target: ExportTarget,
    shutdown: Shutdown,
    interval: Duration,
) -> std::io::Result<thread::JoinHandle<()>> {
    let ticker = channel::tick(interval.max(Duration::from_millis(10)));
    thread::Builder::new()
        .name("window_exporter".into())
        .spawn(move || export_loop(target, shutdown, ticker))
}

fn export_loop(target: ExportTarget, shutdown: Shutdown, ticker: Receiver<std::time::Instant>) {
    info!("[Exporter] writing windows to {:?}", target.dir());
    let mut rounds: u64 = 0;

    // Wake at least every 50ms to notice shutdown between long ticks
    let poll = Duration::from_millis(50);
    while !shutdown.is_triggered() {
        match ticker.recv_timeout(poll) {
            Ok(_) => {
                if let Err(e) = target.export_once() {
                    error!("[Exporter] export failed: {}", e);
                } else {
                    rounds += 1;
                }
            }
            Err(channel::RecvTimeoutError::Timeout) => continue,
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    match target.export_once() {
        Ok(n) => info!("[Exporter] final export: {} windows after {} rounds", n, rounds),
        Err(e) => error!("[Exporter] final export failed: {}", e),
    }
}
