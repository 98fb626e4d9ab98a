//! Circuit graph model for netsim.
//!
//! A [`Design`] owns a set of [`Circuit`]s, each a set of [`Component`]s
//! joined by [`Wire`]s. Connectivity is resolved into a [`Netlist`] by
//! union-find over port endpoints. Structural changes are expressed as
//! [`Transaction`]s and applied atomically by [`Design::apply`], which keeps
//! sub-circuit containment acyclic.

#![warn(missing_docs)]

pub mod arena;
pub mod circuit;
pub mod component;
pub mod design;
pub mod edit;
pub mod error;
pub mod export;
pub mod geom;
pub mod ids;
pub mod netlist;
pub mod port;
pub mod wire;

pub use arena::{Arena, ArenaId};
pub use circuit::Circuit;
pub use component::{
    register_port, Component, ComponentKind, GateOp, PinDirection, SplitDirection,
};
pub use design::Design;
pub use edit::{CircuitEvent, Edit, Transaction, TransactionResult};
pub use error::StructuralError;
pub use export::{ComponentView, NetView, StructuralView};
pub use geom::{Bounds, Location};
pub use ids::{CircuitId, ComponentId, NetId, WireId};
pub use netlist::{Net, Netlist};
pub use port::{PortDirection, PortSpec};
pub use wire::{PinRef, Wire};
