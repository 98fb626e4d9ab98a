//! Errors raised when a structural edit is rejected.

use crate::ids::{CircuitId, ComponentId, WireId};
use netsim_diagnostics::{Diagnostic, DiagnosticCode, Locus};

/// Reasons a transaction is refused. A refused transaction leaves the
/// design exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// The edit would make a circuit contain itself, directly or transitively.
    #[error("placing `{child}` inside `{parent}` would make containment cyclic")]
    CyclicContainment {
        /// Circuit receiving the instance.
        parent: String,
        /// Circuit being instantiated.
        child: String,
    },

    /// A referenced circuit does not exist.
    #[error("circuit with ID {} not found in design", .0.as_raw())]
    UnknownCircuit(CircuitId),

    /// A referenced component does not exist in the edited circuit.
    #[error("component {0} not found")]
    UnknownComponent(ComponentId),

    /// A referenced wire does not exist in the edited circuit.
    #[error("wire with ID {} not found", .0.as_raw())]
    UnknownWire(WireId),

    /// A wire endpoint names a port the component does not have.
    #[error("port {port} out of range for component {component} ({ports} ports)")]
    PortOutOfRange {
        /// The component addressed.
        component: ComponentId,
        /// The requested port index.
        port: u32,
        /// How many ports the component has.
        ports: usize,
    },

    /// A component attribute is outside its legal range.
    #[error("invalid attribute: {reason}")]
    InvalidAttribute {
        /// What is wrong with it.
        reason: String,
    },

    /// Circuit names must be unique and non-empty.
    #[error("invalid circuit name `{0}`")]
    InvalidName(String),
}

impl StructuralError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        StructuralError::InvalidAttribute {
            reason: reason.into(),
        }
    }

    /// Renders the rejection as an `E201` diagnostic against `circuit`.
    pub fn to_diagnostic(&self, circuit: &str) -> Diagnostic {
        Diagnostic::error(
            DiagnosticCode::EDIT_REJECTED,
            self.to_string(),
            Locus::Circuit {
                circuit: circuit.to_string(),
            },
        )
    }
}
