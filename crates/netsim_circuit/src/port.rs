//! Port descriptions exposed by every component kind.

use serde::{Deserialize, Serialize};

/// Whether a port reads its net, drives it, or both.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    /// Reads the net value; never asserts anything.
    Input,
    /// Asserts a value onto the net.
    Output,
    /// Reads and drives.
    InOut,
}

impl PortDirection {
    /// Returns `true` if a pin with this direction contributes a driver value.
    pub fn drives(self) -> bool {
        matches!(self, PortDirection::Output | PortDirection::InOut)
    }

    /// Returns `true` if a pin with this direction observes its net.
    pub fn reads(self) -> bool {
        matches!(self, PortDirection::Input | PortDirection::InOut)
    }
}

/// A named, fixed-width connection point on a component.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name, unique within its component.
    pub name: String,
    /// Signal direction relative to the component.
    pub direction: PortDirection,
    /// Bit width of the port.
    pub width: u32,
}

impl PortSpec {
    /// An input port.
    pub fn input(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            width,
        }
    }

    /// An output port.
    pub fn output(name: impl Into<String>, width: u32) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            width,
        }
    }
}
