//! Structural edits, transactions, and the change events they produce.

use crate::component::ComponentKind;
use crate::geom::Location;
use crate::ids::{CircuitId, ComponentId, WireId};
use crate::wire::PinRef;
use serde::{Deserialize, Serialize};

/// A single structural change to one circuit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Edit {
    /// Place a new component.
    AddComponent {
        /// What to place.
        kind: ComponentKind,
        /// Where to place it.
        location: Location,
        /// Optional label.
        label: Option<String>,
    },
    /// Delete a component and every wire touching it.
    RemoveComponent {
        /// The component to delete.
        component: ComponentId,
    },
    /// Move a component without changing connectivity.
    MoveComponent {
        /// The component to move.
        component: ComponentId,
        /// New anchor position.
        location: Location,
    },
    /// Replace a component's attributes. Wires to ports that no longer
    /// exist are removed.
    SetAttributes {
        /// The component to change.
        component: ComponentId,
        /// The new kind and attributes.
        kind: ComponentKind,
    },
    /// Change or clear a component label.
    SetLabel {
        /// The component to relabel.
        component: ComponentId,
        /// The new label.
        label: Option<String>,
    },
    /// Join two pins.
    AddWire {
        /// First endpoint.
        a: PinRef,
        /// Second endpoint.
        b: PinRef,
    },
    /// Delete a wire.
    RemoveWire {
        /// The wire to delete.
        wire: WireId,
    },
    /// Rename the circuit.
    Rename {
        /// The new name.
        name: String,
    },
}

impl Edit {
    /// Returns `false` for edits that leave connectivity untouched: moves,
    /// labels and the circuit name. Relabeling a `Pin` still changes the
    /// port names instances expose, which [`Design::apply`](crate::Design::apply)
    /// detects separately.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Edit::MoveComponent { .. } | Edit::SetLabel { .. } | Edit::Rename { .. }
        )
    }
}

/// An ordered batch of edits applied atomically to one circuit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    edits: Vec<Edit>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an edit.
    pub fn push(&mut self, edit: Edit) -> &mut Self {
        self.edits.push(edit);
        self
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }

    /// The edits in application order.
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// Returns `true` if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

impl From<Vec<Edit>> for Transaction {
    fn from(edits: Vec<Edit>) -> Self {
        Self { edits }
    }
}

impl FromIterator<Edit> for Transaction {
    fn from_iter<T: IntoIterator<Item = Edit>>(iter: T) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

/// A change notification produced by a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitEvent {
    /// A component was placed.
    ComponentAdded {
        /// The new component.
        component: ComponentId,
    },
    /// A component was deleted.
    ComponentRemoved {
        /// The deleted component.
        component: ComponentId,
    },
    /// A component moved.
    ComponentMoved {
        /// The moved component.
        component: ComponentId,
        /// Old position.
        from: Location,
        /// New position.
        to: Location,
    },
    /// A component's attributes changed.
    AttributesChanged {
        /// The changed component.
        component: ComponentId,
    },
    /// A component's label changed.
    LabelChanged {
        /// The relabeled component.
        component: ComponentId,
    },
    /// A wire was added.
    WireAdded {
        /// The new wire.
        wire: WireId,
    },
    /// A wire was removed, explicitly or with its component.
    WireRemoved {
        /// The removed wire.
        wire: WireId,
    },
    /// The edited circuit's pin list changed, so wires on its instances in
    /// another circuit were renumbered; wires on removed pins were deleted.
    InstanceWiresRemoved {
        /// The circuit holding the instances.
        circuit: CircuitId,
        /// Deleted wires of that circuit.
        wires: Vec<WireId>,
    },
    /// The circuit was renamed.
    Renamed {
        /// Previous name.
        from: String,
        /// New name.
        to: String,
    },
    /// Derived data of a circuit was discarded; simulation states of it must
    /// be rebuilt.
    Invalidated {
        /// The affected circuit.
        circuit: CircuitId,
    },
    /// Marks the end of a committed transaction.
    TransactionDone {
        /// The edited circuit.
        circuit: CircuitId,
    },
}

/// Outcome of a committed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionResult {
    /// The edited circuit.
    pub circuit: CircuitId,
    /// Events in the order the changes happened, ending with
    /// [`CircuitEvent::TransactionDone`].
    pub events: Vec<CircuitEvent>,
    /// The edited circuit and every circuit instantiating it, if the
    /// transaction changed structure.
    pub invalidated: Vec<CircuitId>,
}

impl TransactionResult {
    /// IDs of components added by the transaction, in order.
    pub fn added_components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.events.iter().filter_map(|e| match e {
            CircuitEvent::ComponentAdded { component } => Some(*component),
            _ => None,
        })
    }

    /// IDs of wires added by the transaction, in order.
    pub fn added_wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.events.iter().filter_map(|e| match e {
            CircuitEvent::WireAdded { wire } => Some(*wire),
            _ => None,
        })
    }
}
