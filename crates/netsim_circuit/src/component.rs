//! Component kinds, their attributes, and the ports they expose.
//!
//! Every component is one variant of [`ComponentKind`]. Port lists are
//! derived from the attributes: leaf kinds compute them locally, while a
//! [`ComponentKind::Subcircuit`] takes its ports from the `Pin` components of
//! the circuit it instantiates (see [`Design::ports_of`](crate::Design::ports_of)).
//!
//! Port numbering puts outputs first:
//!
//! | Kind | Ports |
//! |---|---|
//! | gates | `out`, `in0` .. `inN` |
//! | `Not`, `Buffer` | `out`, `in` |
//! | `ControlledBuffer` | `out`, `in`, `en` |
//! | `Mux` | `out`, `sel`, `in0` .. `in(2^sel - 1)` |
//! | `Constant`, `Clock` | `out` |
//! | `Pin` | `pin` (output for input pins, input for output pins) |
//! | `Register` | `q`, `d`, `clk`, `en`, `clr` |
//! | `Splitter` | `bus`, `fan0` .. `fanN` |
//! | `Probe` | `in` |

use crate::error::StructuralError;
use crate::geom::{Bounds, Location};
use crate::ids::CircuitId;
use crate::port::{PortDirection, PortSpec};
use netsim_common::Value;
use serde::{Deserialize, Serialize};

/// Widest gate fan-in accepted.
pub const MAX_GATE_INPUTS: u32 = 32;
/// Widest multiplexer select accepted.
pub const MAX_SELECT_BITS: u32 = 6;

/// Port indices of a [`ComponentKind::Register`].
pub mod register_port {
    /// Stored value output.
    pub const Q: u32 = 0;
    /// Data input.
    pub const D: u32 = 1;
    /// Clock input; captures on the rising edge.
    pub const CLK: u32 = 2;
    /// Write enable. Only an explicit zero disables.
    pub const EN: u32 = 3;
    /// Asynchronous clear.
    pub const CLR: u32 = 4;
}

/// The boolean function of a gate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum GateOp {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// Exclusive OR.
    Xor,
    /// Inverted AND.
    Nand,
    /// Inverted OR.
    Nor,
    /// Inverted XOR.
    Xnor,
}

impl GateOp {
    /// Returns the gate name.
    pub fn name(self) -> &'static str {
        match self {
            GateOp::And => "AND",
            GateOp::Or => "OR",
            GateOp::Xor => "XOR",
            GateOp::Nand => "NAND",
            GateOp::Nor => "NOR",
            GateOp::Xnor => "XNOR",
        }
    }

    /// Returns `true` for the inverted forms.
    pub fn is_inverted(self) -> bool {
        matches!(self, GateOp::Nand | GateOp::Nor | GateOp::Xnor)
    }
}

/// Whether a `Pin` feeds the circuit or observes it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PinDirection {
    /// Drives a value into the circuit; pokeable on the top circuit.
    Input,
    /// Exposes a circuit value to the outside.
    Output,
}

/// Which way a splitter moves bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SplitDirection {
    /// The bus drives the fans.
    Split,
    /// The fans drive the bus.
    Join,
}

/// The tagged set of component kinds the simulator can evaluate.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ComponentKind {
    /// An n-input bitwise gate.
    Gate {
        /// Boolean function.
        op: GateOp,
        /// Width of every port.
        width: u32,
        /// Number of inputs.
        inputs: u32,
    },
    /// Bitwise inverter.
    Not {
        /// Port width.
        width: u32,
    },
    /// Non-inverting buffer.
    Buffer {
        /// Port width.
        width: u32,
    },
    /// Tri-state buffer; stops driving unless `en` is one.
    ControlledBuffer {
        /// Data width.
        width: u32,
    },
    /// Multiplexer with `2^select_bits` data inputs.
    Mux {
        /// Data width.
        width: u32,
        /// Select width.
        select_bits: u32,
    },
    /// A fixed value source.
    Constant {
        /// The value driven.
        value: Value,
    },
    /// A circuit boundary pin.
    Pin {
        /// Port width.
        width: u32,
        /// Input or output.
        direction: PinDirection,
    },
    /// A clock source stepped by simulator ticks.
    Clock {
        /// Ticks spent high per period.
        high_ticks: u32,
        /// Ticks spent low per period.
        low_ticks: u32,
    },
    /// Rising-edge register with enable and asynchronous clear.
    Register {
        /// Data width.
        width: u32,
    },
    /// Bus splitter or joiner. Fan 0 carries the least significant bits.
    Splitter {
        /// Width of each fan, in order.
        fans: Vec<u32>,
        /// Direction of data flow.
        direction: SplitDirection,
    },
    /// Passive observer of a net.
    Probe {
        /// Port width.
        width: u32,
    },
    /// An instance of another circuit.
    Subcircuit {
        /// The instantiated circuit.
        circuit: CircuitId,
    },
}

impl ComponentKind {
    /// Short human-readable kind name.
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Gate { op, .. } => op.name(),
            ComponentKind::Not { .. } => "NOT",
            ComponentKind::Buffer { .. } => "Buffer",
            ComponentKind::ControlledBuffer { .. } => "Controlled Buffer",
            ComponentKind::Mux { .. } => "Multiplexer",
            ComponentKind::Constant { .. } => "Constant",
            ComponentKind::Pin { .. } => "Pin",
            ComponentKind::Clock { .. } => "Clock",
            ComponentKind::Register { .. } => "Register",
            ComponentKind::Splitter { .. } => "Splitter",
            ComponentKind::Probe { .. } => "Probe",
            ComponentKind::Subcircuit { .. } => "Subcircuit",
        }
    }

    /// The circuit this component instantiates, if it is a sub-circuit.
    pub fn subcircuit(&self) -> Option<CircuitId> {
        match self {
            ComponentKind::Subcircuit { circuit } => Some(*circuit),
            _ => None,
        }
    }

    /// Checks attribute ranges. Sub-circuit references are checked by the design.
    pub fn validate(&self) -> Result<(), StructuralError> {
        match self {
            ComponentKind::Gate { width, inputs, op } => {
                check_width(*width)?;
                if *inputs < 2 || *inputs > MAX_GATE_INPUTS {
                    return Err(StructuralError::invalid(format!(
                        "{} gate needs 2..={MAX_GATE_INPUTS} inputs, got {inputs}",
                        op.name()
                    )));
                }
                Ok(())
            }
            ComponentKind::Not { width }
            | ComponentKind::Buffer { width }
            | ComponentKind::ControlledBuffer { width }
            | ComponentKind::Pin { width, .. }
            | ComponentKind::Register { width }
            | ComponentKind::Probe { width } => check_width(*width),
            ComponentKind::Mux { width, select_bits } => {
                check_width(*width)?;
                if *select_bits == 0 || *select_bits > MAX_SELECT_BITS {
                    return Err(StructuralError::invalid(format!(
                        "multiplexer select must be 1..={MAX_SELECT_BITS} bits, got {select_bits}"
                    )));
                }
                Ok(())
            }
            ComponentKind::Constant { value } => check_width(value.width()),
            ComponentKind::Clock {
                high_ticks,
                low_ticks,
            } => {
                if *high_ticks == 0 || *low_ticks == 0 {
                    return Err(StructuralError::invalid(
                        "clock phases must last at least one tick",
                    ));
                }
                Ok(())
            }
            ComponentKind::Splitter { fans, .. } => {
                if fans.is_empty() {
                    return Err(StructuralError::invalid("splitter needs at least one fan"));
                }
                fans.iter().try_for_each(|w| check_width(*w))
            }
            ComponentKind::Subcircuit { .. } => Ok(()),
        }
    }

    /// Port list of a leaf kind; `None` for sub-circuits, whose ports
    /// depend on the instantiated circuit.
    pub fn leaf_ports(&self) -> Option<Vec<PortSpec>> {
        let ports = match self {
            ComponentKind::Gate { width, inputs, .. } => {
                let mut ports = vec![PortSpec::output("out", *width)];
                ports.extend((0..*inputs).map(|i| PortSpec::input(format!("in{i}"), *width)));
                ports
            }
            ComponentKind::Not { width } | ComponentKind::Buffer { width } => {
                vec![PortSpec::output("out", *width), PortSpec::input("in", *width)]
            }
            ComponentKind::ControlledBuffer { width } => vec![
                PortSpec::output("out", *width),
                PortSpec::input("in", *width),
                PortSpec::input("en", 1),
            ],
            ComponentKind::Mux { width, select_bits } => {
                let mut ports = vec![
                    PortSpec::output("out", *width),
                    PortSpec::input("sel", *select_bits),
                ];
                ports.extend(
                    (0..(1u32 << select_bits)).map(|i| PortSpec::input(format!("in{i}"), *width)),
                );
                ports
            }
            ComponentKind::Constant { value } => vec![PortSpec::output("out", value.width())],
            ComponentKind::Pin { width, direction } => vec![PortSpec {
                name: "pin".to_string(),
                direction: match direction {
                    PinDirection::Input => PortDirection::Output,
                    PinDirection::Output => PortDirection::Input,
                },
                width: *width,
            }],
            ComponentKind::Clock { .. } => vec![PortSpec::output("out", 1)],
            ComponentKind::Register { width } => vec![
                PortSpec::output("q", *width),
                PortSpec::input("d", *width),
                PortSpec::input("clk", 1),
                PortSpec::input("en", 1),
                PortSpec::input("clr", 1),
            ],
            ComponentKind::Splitter { fans, direction } => {
                let (bus_dir, fan_dir) = match direction {
                    SplitDirection::Split => (PortDirection::Input, PortDirection::Output),
                    SplitDirection::Join => (PortDirection::Output, PortDirection::Input),
                };
                let mut ports = vec![PortSpec {
                    name: "bus".to_string(),
                    direction: bus_dir,
                    width: fans.iter().sum(),
                }];
                ports.extend(fans.iter().enumerate().map(|(i, w)| PortSpec {
                    name: format!("fan{i}"),
                    direction: fan_dir,
                    width: *w,
                }));
                ports
            }
            ComponentKind::Probe { width } => vec![PortSpec::input("in", *width)],
            ComponentKind::Subcircuit { .. } => return None,
        };
        Some(ports)
    }

    /// Footprint on the canvas, in grid units.
    pub fn size(&self) -> (i32, i32) {
        match self {
            ComponentKind::Gate { inputs, .. } => (50, 10 * (*inputs as i32).max(3)),
            ComponentKind::Not { .. } | ComponentKind::Buffer { .. } => (30, 20),
            ComponentKind::ControlledBuffer { .. } => (20, 20),
            ComponentKind::Mux { select_bits, .. } => (30, 10 * (1 << select_bits) + 20),
            ComponentKind::Register { .. } => (30, 40),
            ComponentKind::Splitter { fans, .. } => (20, 10 * fans.len() as i32),
            ComponentKind::Subcircuit { .. } => (40, 40),
            ComponentKind::Constant { .. }
            | ComponentKind::Pin { .. }
            | ComponentKind::Clock { .. }
            | ComponentKind::Probe { .. } => (20, 20),
        }
    }
}

fn check_width(width: u32) -> Result<(), StructuralError> {
    if width == 0 {
        Err(StructuralError::invalid("bit width must be at least 1"))
    } else {
        Ok(())
    }
}

/// A placed component instance.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Component {
    /// What the component is.
    pub kind: ComponentKind,
    /// Anchor position on the canvas.
    pub location: Location,
    /// Optional user label; also names sub-circuit ports and hierarchy paths.
    pub label: Option<String>,
}

impl Component {
    /// Creates an unlabeled component.
    pub fn new(kind: ComponentKind, location: Location) -> Self {
        Self {
            kind,
            location,
            label: None,
        }
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The rectangle the component occupies.
    pub fn bounds(&self) -> Bounds {
        let (w, h) = self.kind.size();
        Bounds::new(self.location, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_ports_output_first() {
        let kind = ComponentKind::Gate {
            op: GateOp::And,
            width: 4,
            inputs: 3,
        };
        let ports = kind.leaf_ports().unwrap();
        assert_eq!(ports.len(), 4);
        assert_eq!(ports[0].direction, PortDirection::Output);
        assert!(ports[1..].iter().all(|p| p.direction == PortDirection::Input && p.width == 4));
    }

    #[test]
    fn mux_has_power_of_two_inputs() {
        let ports = ComponentKind::Mux {
            width: 8,
            select_bits: 2,
        }
        .leaf_ports()
        .unwrap();
        assert_eq!(ports.len(), 2 + 4);
        assert_eq!(ports[1].width, 2);
    }

    #[test]
    fn register_port_layout() {
        let ports = ComponentKind::Register { width: 4 }.leaf_ports().unwrap();
        assert_eq!(ports[register_port::Q as usize].name, "q");
        assert_eq!(ports[register_port::CLK as usize].width, 1);
        assert_eq!(ports[register_port::CLR as usize].name, "clr");
    }

    #[test]
    fn splitter_bus_is_sum_of_fans() {
        let ports = ComponentKind::Splitter {
            fans: vec![3, 5],
            direction: SplitDirection::Join,
        }
        .leaf_ports()
        .unwrap();
        assert_eq!(ports[0].width, 8);
        assert_eq!(ports[0].direction, PortDirection::Output);
        assert_eq!(ports[2].direction, PortDirection::Input);
    }

    #[test]
    fn input_pin_drives() {
        let ports = ComponentKind::Pin {
            width: 1,
            direction: PinDirection::Input,
        }
        .leaf_ports()
        .unwrap();
        assert!(ports[0].direction.drives());
    }

    #[test]
    fn subcircuit_has_no_leaf_ports() {
        let kind = ComponentKind::Subcircuit {
            circuit: CircuitId::from_raw(0),
        };
        assert!(kind.leaf_ports().is_none());
        assert_eq!(kind.subcircuit(), Some(CircuitId::from_raw(0)));
    }

    #[test]
    fn validation_rejects_bad_attributes() {
        assert!(ComponentKind::Not { width: 0 }.validate().is_err());
        assert!(ComponentKind::Gate {
            op: GateOp::Or,
            width: 1,
            inputs: 1
        }
        .validate()
        .is_err());
        assert!(ComponentKind::Mux {
            width: 1,
            select_bits: 0
        }
        .validate()
        .is_err());
        assert!(ComponentKind::Clock {
            high_ticks: 1,
            low_ticks: 0
        }
        .validate()
        .is_err());
        assert!(ComponentKind::Splitter {
            fans: vec![],
            direction: SplitDirection::Split
        }
        .validate()
        .is_err());
        assert!(ComponentKind::Register { width: 8 }.validate().is_ok());
    }

    #[test]
    fn bounds_follow_location() {
        let c = Component::new(ComponentKind::Probe { width: 1 }, Location::new(100, 40));
        assert_eq!(c.bounds(), Bounds::new(Location::new(100, 40), 20, 20));
    }
}
