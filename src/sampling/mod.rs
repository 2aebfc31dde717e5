// Sampling core: mirrored window buffers, sensors, the periodic scheduler and the loop that
// drives them. Everything here runs on the single sampling thread except reads of
// `SharedSensor` windows.

pub mod acquisition;
pub mod clock;
pub mod runner;
pub mod scheduler;
pub mod sensor;
pub mod window_buffer;
