//! Evaluation of leaf components.
//!
//! [`evaluate`] maps the values a component reads on its ports (plus its
//! [`InstanceData`], if stateful) to the values it drives. Sub-circuits are
//! not evaluated here: the propagator moves values across the hierarchy.

use crate::state::InstanceData;
use netsim_circuit::{register_port, ComponentKind, GateOp, PinDirection, SplitDirection};
use netsim_common::{Bit, Value, WidthMismatch};

/// Values a component drives, as `(port index, value)`.
pub type Outputs = Vec<(u32, Value)>;

/// A component could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// Operands disagreed on width.
    #[error(transparent)]
    Width(#[from] WidthMismatch),

    /// The input slice does not match the component's port list.
    #[error("{kind} has {expected} ports, got {got} values")]
    Arity {
        /// Component kind name.
        kind: &'static str,
        /// Port count.
        expected: usize,
        /// Values supplied.
        got: usize,
    },

    /// A stateful component has no (or mismatched) instance data.
    #[error("{0} is missing its instance data")]
    MissingData(&'static str),
}

/// Evaluates a leaf component.
///
/// `inputs[i]` is what the component reads on port `i`, already adapted to
/// the port width. Output ports appear in `inputs` too; their entries are
/// ignored.
pub fn evaluate(
    kind: &ComponentKind,
    inputs: &[Value],
    data: Option<&mut InstanceData>,
) -> Result<Outputs, EvalError> {
    if let Some(ports) = kind.leaf_ports() {
        if ports.len() != inputs.len() {
            return Err(EvalError::Arity {
                kind: kind.name(),
                expected: ports.len(),
                got: inputs.len(),
            });
        }
    }

    match kind {
        ComponentKind::Gate { op, .. } => Ok(vec![(0, gate(*op, &inputs[1..])?)]),
        ComponentKind::Not { .. } => Ok(vec![(0, inputs[1].not())]),
        ComponentKind::Buffer { .. } => Ok(vec![(0, inputs[1].clone())]),
        ComponentKind::ControlledBuffer { width } => {
            let out = match first_bit(&inputs[2]) {
                Bit::One => inputs[1].clone(),
                _ => Value::unknown(*width),
            };
            Ok(vec![(0, out)])
        }
        ComponentKind::Mux { width, .. } => {
            let select = &inputs[1];
            let out = match select.to_u64() {
                Some(index) => inputs
                    .get(2 + index as usize)
                    .cloned()
                    .unwrap_or_else(|| Value::error(*width)),
                None if select.has_error() => Value::error(*width),
                None => Value::unknown(*width),
            };
            Ok(vec![(0, out)])
        }
        ComponentKind::Constant { value } => Ok(vec![(0, value.clone())]),
        ComponentKind::Pin {
            direction: PinDirection::Input,
            ..
        } => match data {
            Some(InstanceData::Pin { value }) => Ok(vec![(0, value.clone())]),
            _ => Err(EvalError::MissingData("Pin")),
        },
        ComponentKind::Clock { .. } => match data {
            Some(InstanceData::Clock { level }) => Ok(vec![(0, Value::filled(1, *level))]),
            _ => Err(EvalError::MissingData("Clock")),
        },
        ComponentKind::Register { width } => match data {
            Some(InstanceData::Register { value, last_clock }) => {
                let clock = first_bit(&inputs[register_port::CLK as usize]);
                let enable = first_bit(&inputs[register_port::EN as usize]);
                let clear = first_bit(&inputs[register_port::CLR as usize]);
                if clear == Bit::One {
                    *value = Value::zeros(*width);
                } else if *last_clock == Bit::Zero && clock == Bit::One && enable != Bit::Zero {
                    *value = inputs[register_port::D as usize].clone();
                }
                *last_clock = clock;
                Ok(vec![(register_port::Q, value.clone())])
            }
            _ => Err(EvalError::MissingData("Register")),
        },
        ComponentKind::Splitter { fans, direction } => match direction {
            SplitDirection::Split => {
                let bus = &inputs[0];
                let mut offset = 0;
                Ok(fans
                    .iter()
                    .enumerate()
                    .map(|(i, &width)| {
                        let part = bus.slice(offset, width);
                        offset += width;
                        (i as u32 + 1, part)
                    })
                    .collect())
            }
            SplitDirection::Join => Ok(vec![(0, Value::concat(&inputs[1..]))]),
        },
        ComponentKind::Pin {
            direction: PinDirection::Output,
            ..
        }
        | ComponentKind::Probe { .. }
        | ComponentKind::Subcircuit { .. } => Ok(Vec::new()),
    }
}

fn gate(op: GateOp, inputs: &[Value]) -> Result<Value, EvalError> {
    let (first, rest) = inputs.split_first().ok_or(EvalError::Arity {
        kind: op.name(),
        expected: 2,
        got: 0,
    })?;
    let mut acc = first.clone();
    for v in rest {
        acc = match op {
            GateOp::And | GateOp::Nand => acc.and(v)?,
            GateOp::Or | GateOp::Nor => acc.or(v)?,
            GateOp::Xor | GateOp::Xnor => acc.xor(v)?,
        };
    }
    Ok(if op.is_inverted() { acc.not() } else { acc })
}

fn first_bit(value: &Value) -> Bit {
    if value.width() == 0 {
        Bit::Unknown
    } else {
        value.get(0)
    }
}
