//! scheduler.rs
//! Multi-rate periodic scheduler: one due-time entry per sensor in a min-heap.
//!
//! - **Fixed grid:** after firing, `next_due += period`; wake-up jitter and sampling time never
//!   feed back into the schedule, so there is no drift.
//! - **O(log n) reschedule:** only the fired entry changes; `BinaryHeap::peek_mut` sifts it down.
//! - **Decoupled firing:** `run_once_blocking` updates bookkeeping and returns the fired source
//!   *before* the caller samples it.
//! - **Ties:** equal due times fire in registration order.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    time::{Duration, Instant},
};

use crate::{
    error::SchedulingError,
    sampling::clock::{Clock, Shutdown, WaitOutcome},
};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Period of a source sampled at `rate` Hz, truncated to whole nanoseconds.
pub fn period_for_rate(rate: u64) -> Option<Duration> {
    if rate == 0 {
        return None;
    }
    let nanos = NANOS_PER_SEC / rate;
    (nanos > 0).then(|| Duration::from_nanos(nanos))
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleEntry {
    pub next_due: Instant,
    pub period: Duration,
    pub source: usize,
    seq: u64,
}

impl ScheduleEntry {
    fn key(&self) -> (Instant, u64) {
        (self.next_due, self.seq)
    }
}

impl PartialEq for ScheduleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduleEntry {}

impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the std max-heap pops the earliest due time.
impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// One firing, reported before the source is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub source: usize,
    /// The due time that elapsed.
    pub due: Instant,
    /// Where the source has been rescheduled to (`due + period`).
    pub next_due: Instant,
    pub period: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Fired(Firing),
    Cancelled,
}

#[derive(Debug, Default)]
pub struct PeriodicScheduler {
    heap: BinaryHeap<ScheduleEntry>,
    next_seq: u64,
}

impl PeriodicScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` at `rate` Hz, first due at `initial_due`.
    ///
    /// Rejects rates whose period rounds to zero; nothing is registered on error.
    pub fn register(
        &mut self,
        source: usize,
        rate: u64,
        initial_due: Instant,
    ) -> Result<(), SchedulingError> {
        let period = period_for_rate(rate)
            .ok_or(SchedulingError::InvalidPeriod { source_id: source, rate })?;
        self.register_period(source, period, initial_due)
    }

    pub fn register_period(
        &mut self,
        source: usize,
        period: Duration,
        initial_due: Instant,
    ) -> Result<(), SchedulingError> {
        if period.is_zero() {
            return Err(SchedulingError::InvalidPeriod { source_id: source, rate: 0 });
        }
        if self.heap.iter().any(|e| e.source == source) {
            return Err(SchedulingError::Duplicate(source));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduleEntry {
            next_due: initial_due,
            period,
            source,
            seq,
        });
        Ok(())
    }

    /// Drops a source from the schedule.
    pub fn remove(&mut self, source: usize) -> Result<(), SchedulingError> {
        let before = self.heap.len();
        self.heap.retain(|e| e.source != source);
        if self.heap.len() == before {
            return Err(SchedulingError::UnknownSource(source));
        }
        Ok(())
    }

    /// Waits for the earliest due time, advances that entry by one period and returns it.
    pub fn run_once_blocking<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        shutdown: &Shutdown,
    ) -> Result<Tick, SchedulingError> {
        let due = self.heap.peek().ok_or(SchedulingError::Empty)?.next_due;

        if clock.wait_until(due, shutdown) == WaitOutcome::Cancelled {
            return Ok(Tick::Cancelled);
        }

        Ok(Tick::Fired(self.fire_earliest()?))
    }

    /// Reschedules the earliest entry without waiting.
    pub fn fire_earliest(&mut self) -> Result<Firing, SchedulingError> {
        let mut top = self.heap.peek_mut().ok_or(SchedulingError::Empty)?;
        let due = top.next_due;
        top.next_due = due + top.period;
        Ok(Firing {
            source: top.source,
            due,
            next_due: top.next_due,
            period: top.period,
        })
        // PeekMut drop sifts the entry back into place
    }

    /// (source, due time) of the next entry to fire.
    pub fn peek_next(&self) -> Option<(usize, Instant)> {
        self.heap.peek().map(|e| (e.source, e.next_due))
    }

    pub fn next_due(&self, source: usize) -> Option<Instant> {
        self.entry(source).map(|e| e.next_due)
    }

    pub fn period_of(&self, source: usize) -> Option<Duration> {
        self.entry(source).map(|e| e.period)
    }

    fn entry(&self, source: usize) -> Option<&ScheduleEntry> {
        self.heap.iter().find(|e| e.source == source)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
