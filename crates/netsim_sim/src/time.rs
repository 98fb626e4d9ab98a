//! Simulation time: clock ticks subdivided into propagation rounds.
//!
//! A tick advances the clocks; within a tick, propagation proceeds in rounds
//! (unit gate delays). Queue entries stamped with the same [`SimTime`] are
//! applied together before any component is re-evaluated.

use std::cmp::Ordering;
use std::fmt;

/// A point in simulation time: `(tick, round)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SimTime {
    /// Clock ticks since the last reset.
    pub tick: u64,
    /// Propagation round within the tick.
    pub round: u32,
}

impl SimTime {
    /// Tick zero, round zero.
    pub fn zero() -> Self {
        Self { tick: 0, round: 0 }
    }

    /// Round zero of `tick`.
    pub fn at_tick(tick: u64) -> Self {
        Self { tick, round: 0 }
    }

    /// The following round of the same tick.
    pub fn next_round(&self) -> Self {
        Self {
            tick: self.tick,
            round: self.round.saturating_add(1),
        }
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tick.cmp(&other.tick).then(self.round.cmp(&other.round))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {}", self.tick)?;
        if self.round > 0 {
            write!(f, "+r{}", self.round)?;
        }
        Ok(())
    }
}
