//! Wires joining component pins.

use crate::ids::ComponentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One endpoint: a port of a component instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PinRef {
    /// The component owning the port.
    pub component: ComponentId,
    /// Index into the component's port list.
    pub port: u32,
}

impl PinRef {
    /// Creates a pin reference.
    pub fn new(component: ComponentId, port: u32) -> Self {
        Self { component, port }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.port)
    }
}

/// An undirected electrical connection between two pins.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Wire {
    /// First endpoint.
    pub a: PinRef,
    /// Second endpoint.
    pub b: PinRef,
}

impl Wire {
    /// Returns `true` if either end is attached to `component`.
    pub fn touches(&self, component: ComponentId) -> bool {
        self.a.component == component || self.b.component == component
    }

    /// Both endpoints.
    pub fn ends(&self) -> [PinRef; 2] {
        [self.a, self.b]
    }
}
