//! Measured tick rate while auto-ticking.

use netsim_common::Frequency;
use std::collections::VecDeque;
use std::time::Instant;

/// Number of tick timestamps kept for the rate estimate.
pub const DEFAULT_SAMPLES: usize = 1000;

/// Estimates the achieved tick rate from the timestamps of recent ticks.
///
/// Cleared whenever auto-ticking stops or the requested frequency changes,
/// so the estimate never mixes two pacing regimes.
#[derive(Clone, Debug)]
pub struct TickCounter {
    samples: VecDeque<Instant>,
    capacity: usize,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SAMPLES)
    }
}

impl TickCounter {
    /// A counter keeping the last [`DEFAULT_SAMPLES`] ticks.
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter keeping the last `capacity` ticks (at least two).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a tick at `at`.
    pub fn record(&mut self, at: Instant) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(at);
    }

    /// Forgets every recorded tick.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Ticks per second over the recorded window. `None` until two ticks at
    /// distinct instants have been recorded.
    pub fn tick_rate(&self) -> Option<f64> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let elapsed = last.duration_since(*first).as_secs_f64();
        if self.samples.len() < 2 || elapsed <= 0.0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 / elapsed)
    }

    /// Full clock cycles per second: a cycle is two ticks, one per edge.
    pub fn cycle_frequency(&self) -> Option<Frequency> {
        Frequency::from_hz(self.tick_rate()? / 2.0)
    }
}
