//! Fixed-capacity ring buffer for sensor telemetry.

pub const DEFAULT_CAPACITY: usize = 10;

/// Ring of the most recent samples. `push` overwrites the oldest slot
/// once full; `clear` drops the contents without reallocating.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    slots: Vec<f32>,
    head: usize,
    count: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![0.0; capacity],
            head: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn push(&mut self, value: f32) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.slots.len();
        if self.count < self.slots.len() {
            self.count += 1;
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }

    /// Mean of the `window` most recently pushed samples, newest first;
    /// `window == 0` (or larger than the occupancy) averages everything
    /// stored. Samples are taken in insertion order, not physical slot
    /// order, so the result is stable across ring wrap.
    pub fn average(&self, window: usize) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        let n = if window == 0 {
            self.count
        } else {
            window.min(self.count)
        };
        Some(self.recent(n).sum::<f32>() / n as f32)
    }

    pub fn min(&self) -> Option<f32> {
        self.recent(self.count).reduce(f32::min)
    }

    pub fn max(&self) -> Option<f32> {
        self.recent(self.count).reduce(f32::max)
    }

    /// Iterates the `n` most recent samples, newest first.
    fn recent(&self, n: usize) -> impl Iterator<Item = f32> + '_ {
        let capacity = self.slots.len();
        (0..n).map(move |i| self.slots[(self.head + capacity - 1 - i) % capacity])
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
