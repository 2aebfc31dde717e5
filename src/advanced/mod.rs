// Advanced: background export, SVG rendering, signal handling and CPU pinning around the
// sampling core.

pub mod affinity;
pub mod exporter;
pub mod plot;
pub mod signals;
