//! Configuration types deserialized from `netsim.toml`.

use netsim_common::Frequency;
use serde::Deserialize;

/// Default bound on propagation rounds within one run.
///
/// Long ripple chains in practical designs settle in well under a hundred
/// rounds; a thousand leaves headroom for deep hierarchies while still
/// reporting a feedback loop within a few milliseconds.
pub const DEFAULT_OSCILLATION_ROUNDS: u32 = 1000;

/// Default capacity of the simulation thread's command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Complete simulator configuration. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulatorConfig {
    /// Propagation limits and queue sizing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Clock pacing.
    #[serde(default)]
    pub clock: ClockConfig,
}

/// The `[simulation]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Maximum propagation rounds per run before oscillation is reported.
    #[serde(default = "default_oscillation_rounds")]
    pub oscillation_rounds: u32,
    /// Bound of the command channel feeding the simulation thread.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Initial value of top-level input pins after a reset.
    #[serde(default)]
    pub pin_default: PinDefault,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            oscillation_rounds: DEFAULT_OSCILLATION_ROUNDS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pin_default: PinDefault::default(),
        }
    }
}

/// What an input pin drives before anyone pokes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDefault {
    /// All bits zero.
    #[default]
    Zero,
    /// All bits unknown.
    Unknown,
}

/// The `[clock]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    /// Automatic tick rate used when auto-ticking is on.
    #[serde(default)]
    pub frequency: Frequency,
    /// Whether the simulation thread starts ticking on its own.
    #[serde(default)]
    pub auto_tick: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::default(),
            auto_tick: false,
        }
    }
}

fn default_oscillation_rounds() -> u32 {
    DEFAULT_OSCILLATION_ROUNDS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
