//! window_buffer.rs
//! Fixed-capacity sample window backed by a mirrored, double-length array.
//!
//! Every sample is written twice: at `next` and at `next + W`. The last `valid` samples
//! therefore always sit in one contiguous run `storage[next + W - valid .. next + W]`,
//! so readers never wrap or take modulo.
//!
//! ```text
//! W = 3, after appending 1,2,3,4
//!   storage: [4, 2, 3 | 4, 2, 3]     next = 1
//!                 ^^^^^^^^^          begin = 1, end = 4  -> [2, 3, 4]
//! ```

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct SampleWindowBuffer {
    window_length: usize,
    storage: Vec<f64>,
    next_write_index: usize,
    valid_count: usize,
}

impl SampleWindowBuffer {
    /// Creates a zeroed buffer holding `window_length` samples (`2 * window_length` slots).
    ///
    /// `window_length` must be at least 1; callers validate this when building a sensor.
    pub fn new(window_length: usize) -> Self {
        debug_assert!(window_length >= 1, "window_length must be positive");
        Self {
            window_length,
            storage: vec![0.0; 2 * window_length],
            next_write_index: 0,
            valid_count: 0,
        }
    }

    /// Writes one sample into both halves and advances the write index.
    #[inline]
    pub fn append(&mut self, sample: f64) {
        let i = self.next_write_index;
        self.storage[i] = sample;
        self.storage[i + self.window_length] = sample;

        self.next_write_index = (i + 1) % self.window_length;
        self.valid_count = (self.valid_count + 1).min(self.window_length);
    }

    /// Read-only view of the current window. Valid until the next `append`.
    #[inline]
    pub fn read_window(&self) -> WindowView<'_> {
        let end = self.next_write_index + self.window_length;
        WindowView {
            begin: end - self.valid_count,
            end,
            storage: &self.storage,
        }
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    pub fn next_write_index(&self) -> usize {
        self.next_write_index
    }

    pub fn is_full(&self) -> bool {
        self.valid_count == self.window_length
    }
}

/// Borrowed window: `storage[begin..end]` is oldest → newest.
#[derive(Debug, Clone, Copy)]
pub struct WindowView<'a> {
    pub begin: usize,
    pub end: usize,
    pub storage: &'a [f64],
}

impl<'a> WindowView<'a> {
    #[inline]
    pub fn as_slice(&self) -> &'a [f64] {
        &self.storage[self.begin..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn newest(&self) -> Option<f64> {
        self.as_slice().last().copied()
    }

    pub fn oldest(&self) -> Option<f64> {
        self.as_slice().first().copied()
    }

    /// Newest → oldest, `end - 1` down to and including `begin`.
    pub fn iter_newest_first(self) -> impl Iterator<Item = f64> + 'a {
        self.as_slice().iter().rev().copied()
    }

    pub fn to_snapshot(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }
}

/// Owned copy of one sensor's window plus the metadata an exporter needs.
///
/// Taken under the sensor lock, written to disk after the lock is released.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSnapshot {
    /// Scheduler source id; unique within one sampler, unlike `name`.
    pub source: usize,
    pub name: String,
    pub label: String,
    pub sampling_rate: u64,
    pub min_value: f64,
    pub max_value: f64,
    pub window_length: usize,
    pub samples: Vec<f64>,
}

impl WindowSnapshot {
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.window_length
    }

    /// Seconds between sample `index` and the newest sample (newest = 0.0, older negative).
    pub fn time_offset_s(&self, index: usize) -> f64 {
        let newest = self.samples.len().saturating_sub(1);
        (index.min(newest) as f64 - newest as f64) / self.sampling_rate as f64
    }
}
