//! # rts-sampler entry point
//!
//! Loads a JSON sensor configuration, samples every enabled sensor at its own rate and keeps a
//! sliding window per sensor. A background exporter writes the windows to CSV + SVG.
//!
//! ## Outputs (default `data/windows/`)
//! - `<source>_<sensor>.csv`: current window, oldest first.
//! - `summary.csv`: per-sensor counters (fired, failures, overruns, late wake-ups) + window stats.
//! - `events.csv`: sampling event log.
//! - `windows.svg`: one panel per sensor.

use std::{path::PathBuf, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use rts_sampler::{
    Sampler, Shutdown,
    advanced::{
        affinity::{pin_current_thread, raise_current_thread_priority},
        exporter::spawn_exporter,
        signals::spawn_signal_listener,
    },
    load_config,
};

#[derive(Debug, Parser)]
#[command(name = "rts-sampler", about = "Multi-rate windowed sensor sampler")]
struct Cli {
    /// JSON configuration file
    config: PathBuf,

    /// Stop after this many seconds (runs until SIGINT/SIGTERM otherwise)
    #[arg(long)]
    duration: Option<u64>,

    /// Overrides runtime.export_dir
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Overrides runtime.export_interval_ms
    #[arg(long)]
    export_interval_ms: Option<u64>,

    /// Disable the background exporter
    #[arg(long)]
    no_export: bool,

    /// Log the parsed configuration before starting
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    info!("=== RTS SAMPLER START ===");

    let cfg = load_config(&cli.config)
        .with_context(|| format!("invalid configuration {:?}", cli.config))?;
    if cli.print_config {
        info!("Configuration:\n{}", cfg.to_pretty_json());
    }

    let mut sampler = Sampler::from_config(&cfg).context("failed to set up sensors")?;
    let shutdown = Shutdown::new();

    let exporter = if cli.no_export {
        None
    } else {
        let dir = cli
            .export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&cfg.runtime.export_dir));
        let interval = Duration::from_millis(
            cli.export_interval_ms.unwrap_or(cfg.runtime.export_interval_ms),
        );
        let handle = spawn_exporter(sampler.export_target(dir), shutdown.clone(), interval)
            .context("failed to start exporter")?;
        Some(handle)
    };

    if let Some(secs) = cli.duration {
        let stop = shutdown.clone();
        thread::Builder::new()
            .name("run_timer".into())
            .spawn(move || {
                thread::sleep(Duration::from_secs(secs));
                info!("[Main] Time's up! Stopping sampler");
                stop.trigger();
            })
            .context("failed to start run timer")?;
        info!("[Main] Running for {} seconds...", secs);
    }

    // SIGINT/SIGTERM end the run the same way --duration does
    if let Err(e) = spawn_signal_listener(shutdown.clone()) {
        warn!("[Main] Signal handlers not installed: {}", e);
    }

    if let Some(core) = cfg.runtime.pin_core {
        pin_current_thread(core);
    }
    if cfg.runtime.max_priority {
        raise_current_thread_priority();
    }

    let status = sampler.run(&shutdown);
    shutdown.trigger();

    if let Some(handle) = exporter {
        if handle.join().is_err() {
            error!("Exporter thread panicked");
        }
    }

    let status = status.context("sampling loop aborted")?;
    info!(
        "[Main] Stopped after {} firings ({} acquisition failures, cancelled: {})",
        status.firings, status.acquisition_failures, status.cancelled
    );
    for s in &sampler.metrics().lock().sensors {
        info!(
            "  {:<16} fired {:>8}  failed {:>6}  overruns {:>6}  late {:>6}  max lateness {} us",
            s.name, s.fired, s.acquisition_failures, s.overruns, s.late_wakeups, s.max_lateness_us
        );
    }
    info!("=== RTS SAMPLER FINISHED ===");
    Ok(())
}
