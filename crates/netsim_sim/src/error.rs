//! Simulation error types.
//!
//! Everything that can go wrong while building, driving or editing a running
//! simulation is a variant of [`SimError`].

use netsim_circuit::{ComponentId, NetId, StructuralError};

/// Errors raised by the simulator and the simulation thread.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The design has no top-level circuit to instantiate.
    #[error("design has no top-level circuit")]
    NoTopCircuit,

    /// A structural edit or lookup failed in the circuit model.
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Propagation did not settle within the round bound.
    #[error("propagation did not settle within {rounds} rounds at tick {tick}")]
    OscillationDetected {
        /// Tick during which the bound was hit.
        tick: u64,
        /// Rounds processed before giving up.
        rounds: u32,
    },

    /// A circuit-state ID does not name a live state.
    #[error("simulation state {0} not found")]
    UnknownState(u32),

    /// A net ID is out of range for the state's netlist.
    #[error("net {net} not found in simulation state {state}")]
    UnknownNet {
        /// Raw state ID.
        state: u32,
        /// The missing net.
        net: NetId,
    },

    /// Only input pins of the top-level state accept pokes.
    #[error("component {component} in simulation state {state} cannot be poked: {reason}")]
    NotPokeable {
        /// Raw state ID.
        state: u32,
        /// The rejected component.
        component: ComponentId,
        /// What disqualifies it.
        reason: String,
    },

    /// The simulation thread has exited.
    #[error("simulation thread has shut down")]
    Shutdown,

    /// The simulation thread's command queue is full.
    #[error("simulation command queue is full")]
    ChannelFull,

    /// The OS refused to start the simulation thread.
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(String),
}
