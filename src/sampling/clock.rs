//! clock.rs
//! Monotonic time source + cancellable wait used at the scheduler's single suspension point.
//!
//! - `SystemClock`: `Instant` + `SpinSleeper`, sleeping in bounded slices so a shutdown
//!   request is noticed within `poll` even when the next due time is far away.
//! - `SimulatedClock`: jumps straight to the requested deadline; deterministic tests and benches.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use spin_sleep::{SpinSleeper, SpinStrategy};

/// Outcome of waiting for a due time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Shutdown flag shared by the sampling loop, exporter and `main`.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

pub trait Clock {
    fn now(&self) -> Instant;

    /// Blocks until `deadline` (monotonic) or until `shutdown` is triggered.
    fn wait_until(&self, deadline: Instant, shutdown: &Shutdown) -> WaitOutcome;
}

pub struct SystemClock {
    sleeper: SpinSleeper,
    poll: Duration,
}

impl SystemClock {
    /// `spin_threshold_us`: native sleep accuracy handed to `SpinSleeper`.
    /// `poll`: longest uninterrupted sleep before re-checking the shutdown flag.
    pub fn new(spin_threshold_us: u32, poll: Duration) -> Self {
        Self {
            sleeper: SpinSleeper::new(spin_threshold_us.saturating_mul(1_000))
                .with_spin_strategy(SpinStrategy::YieldThread),
            poll: poll.max(Duration::from_millis(1)),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(100, Duration::from_millis(20))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wait_until(&self, deadline: Instant, shutdown: &Shutdown) -> WaitOutcome {
        loop {
            if shutdown.is_triggered() {
                return WaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Elapsed;
            }
            self.sleeper.sleep((deadline - now).min(self.poll));
        }
    }
}

/// Virtual clock: `wait_until` advances time instead of sleeping.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    now: Arc<Mutex<Instant>>,
}

impl SimulatedClock {
    pub fn new(start: Instant) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Moves time forward, e.g. to model a slow acquisition.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn wait_until(&self, deadline: Instant, shutdown: &Shutdown) -> WaitOutcome {
        if shutdown.is_triggered() {
            return WaitOutcome::Cancelled;
        }
        let mut now = self.now.lock();
        if *now < deadline {
            *now = deadline;
        }
        WaitOutcome::Elapsed
    }
}
