//! Read-only copies of simulation state for observers on other threads.
//!
//! The simulator publishes a fresh [`Snapshot`] into a [`SnapshotCell`]
//! whenever propagation settles (or gives up), on reset, and after edits.
//! Readers never see a half-propagated state.

use crate::state::{StateId, StateTree};
use netsim_circuit::{CircuitId, NetId};
use netsim_common::Value;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

/// Net values of one circuit state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateSnapshot {
    /// State ID within the tree it was taken from.
    pub id: StateId,
    /// Instantiated circuit.
    pub circuit: CircuitId,
    /// Parent state, `None` for the root.
    pub parent: Option<StateId>,
    /// Hierarchical path.
    pub path: String,
    /// Resolved value of every net, indexed by net ID.
    pub nets: Vec<Value>,
}

impl StateSnapshot {
    /// Value of `net`.
    pub fn net(&self, net: NetId) -> Option<&Value> {
        self.nets.get(net.as_raw() as usize)
    }
}

/// Simulator status plus every net value at one settled moment.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Ticks since the last reset.
    pub tick: u64,
    /// The last run hit the round bound.
    pub oscillating: bool,
    /// A component evaluation has failed since the last reset.
    pub exception: bool,
    /// Every state, parents before children. Empty before the first publish.
    pub states: Vec<StateSnapshot>,
}

impl Snapshot {
    pub(crate) fn capture(tree: &StateTree, tick: u64, oscillating: bool, exception: bool) -> Self {
        let states = tree
            .states()
            .map(|(id, state)| StateSnapshot {
                id,
                circuit: state.circuit(),
                parent: state.parent().map(|(p, _)| p),
                path: state.path().to_string(),
                nets: state.net_values().cloned().collect(),
            })
            .collect();
        Self {
            tick,
            oscillating,
            exception,
            states,
        }
    }

    /// The top-level state.
    pub fn root(&self) -> Option<&StateSnapshot> {
        self.states.iter().find(|s| s.parent.is_none())
    }

    /// Looks up a state by ID.
    pub fn state(&self, id: StateId) -> Option<&StateSnapshot> {
        self.states.iter().find(|s| s.id == id)
    }

    /// Looks up a state by hierarchical path.
    pub fn find(&self, path: &str) -> Option<&StateSnapshot> {
        self.states.iter().find(|s| s.path == path)
    }
}

/// The latest published snapshot, shared between the simulation thread and
/// any number of readers.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: Mutex<Arc<Snapshot>>,
}

impl SnapshotCell {
    /// Creates a cell holding `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            current: Mutex::new(Arc::new(snapshot)),
        }
    }

    /// The most recently published snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        let guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub(crate) fn store(&self, snapshot: Snapshot) {
        let mut guard = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(snapshot);
    }
}
