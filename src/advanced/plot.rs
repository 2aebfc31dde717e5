//! SVG rendering of sensor windows: one panel per sensor, stacked vertically.
//!
//! X axis: seconds relative to the newest sample (window span on the left, 0 on the right).
//! Y axis: the sensor's declared `[min_value, max_value]`; falls back to the data range when the
//! declared range is empty or does not contain any sample.

use std::{fs, path::Path};

use plotters::{coord::Shift, prelude::*};

use crate::{error::ExportError, sampling::window_buffer::WindowSnapshot};

const PANEL_HEIGHT: u32 = 220;
const WIDTH: u32 = 900;

/// Y range for one panel.
pub fn y_range(snapshot: &WindowSnapshot) -> (f64, f64) {
    let (lo, hi) = (snapshot.min_value, snapshot.max_value);
    let declared_ok = lo.is_finite() && hi.is_finite() && hi > lo;
    let data_in_range = snapshot.samples.iter().any(|v| (lo..=hi).contains(v));

    if declared_ok && (snapshot.samples.is_empty() || data_in_range) {
        return (lo, hi);
    }
    if snapshot.samples.is_empty() {
        return (0.0, 1.0);
    }
    let min = snapshot.samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = snapshot.samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (min, max.max(min + 1e-6))
}

/// Renders every window into one SVG file at `path`.
pub fn render_windows_svg(snapshots: &[WindowSnapshot], path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let panels = snapshots.len().max(1);
    let height = PANEL_HEIGHT * panels as u32;

    let root = SVGBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let areas = root.split_evenly((panels, 1));
    for (area, snapshot) in areas.iter().zip(snapshots) {
        plot_window(area, snapshot)?;
    }
    root.present()?;
    Ok(())
}

fn plot_window(
    area: &DrawingArea<SVGBackend, Shift>,
    snapshot: &WindowSnapshot,
) -> Result<(), ExportError> {
    let span = snapshot.window_length as f64 / snapshot.sampling_rate as f64;
    let (min_y, max_y) = y_range(snapshot);
    let title = format!(
        "{} [{}] {}/{} samples",
        snapshot.name,
        snapshot.label,
        snapshot.samples.len(),
        snapshot.window_length
    );

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(25)
        .y_label_area_size(50)
        .build_cartesian_2d(-span..0.0, min_y..max_y)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("s")
        .y_desc(snapshot.label.as_str())
        .draw()?;
    chart.draw_series(LineSeries::new(
        snapshot
            .samples
            .iter()
            .enumerate()
            .map(|(i, v)| (snapshot.time_offset_s(i), *v)),
        &BLUE,
    ))?;
    Ok(())
}
