//! Event-driven propagation engine for netsim.
//!
//! A [`Simulator`] instantiates a design's top circuit as a tree of
//! [`CircuitState`]s and propagates value changes through it in rounds of
//! unit delay, with four-state multi-driver resolution, edge-triggered
//! registers and sub-circuit boundaries crossed in both directions.
//!
//! # Architecture
//!
//! - [`StateTree`] holds one [`CircuitState`] per circuit instance, each with
//!   a [`NetState`] per net and per-component [`InstanceData`].
//! - [`Propagator`] owns the event queue and runs rounds until the queue
//!   empties or the configured round bound flags oscillation.
//! - [`Simulator`] ties design, tree and propagator together: ticks, pokes,
//!   resets, structural edits, listeners and snapshots.
//! - [`SimulationThread`] runs a simulator on its own thread behind a
//!   bounded command channel, with optional automatic ticking.
//!
//! # Usage
//!
//! ```ignore
//! use netsim_sim::Simulator;
//!
//! let mut sim = Simulator::new(design, SimulatorConfig::default())?;
//! sim.poke(sim.root(), input_pin, "1".parse()?)?;
//! sim.settle()?;
//! let out = sim.pin_value(sim.root(), output_pin, 0);
//! ```

#![warn(missing_docs)]

pub mod drive;
pub mod error;
pub mod evaluator;
pub mod propagator;
pub mod simulator;
pub mod snapshot;
pub mod state;
pub mod thread;
pub mod tick_counter;
pub mod time;

pub use drive::{resolve_drivers, NetState};
pub use error::SimError;
pub use evaluator::{evaluate, EvalError, Outputs};
pub use propagator::{EvalFailure, Phase, PropagationStats, Propagator, RunOutcome};
pub use simulator::{Simulator, SimulatorEvent};
pub use snapshot::{Snapshot, SnapshotCell, StateSnapshot};
pub use state::{clock_level, CircuitState, InstanceData, StateId, StateTree};
pub use thread::SimulationThread;
pub use tick_counter::TickCounter;
pub use time::SimTime;
