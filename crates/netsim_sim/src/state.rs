//! The circuit-state tree: one [`CircuitState`] per circuit instance.
//!
//! The root state instantiates the design's top circuit. Every sub-circuit
//! component owns a child state, so the tree mirrors the instantiation
//! hierarchy. Each state holds one [`NetState`] per net of its circuit's
//! netlist and per-component [`InstanceData`] for stateful components.

use crate::drive::NetState;
use crate::error::SimError;
use netsim_circuit::{
    define_id, Arena, CircuitId, Component, ComponentId, ComponentKind, Design, NetId, Netlist,
    PinDirection, PinRef, StructuralError,
};
use netsim_common::{Bit, Value};
use netsim_config::PinDefault;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

define_id!(
    /// Opaque, copyable ID for a circuit state in a [`StateTree`].
    StateId
);

/// Mutable per-instance data of stateful components.
#[derive(Clone, Debug, PartialEq)]
pub enum InstanceData {
    /// Stored register contents and the clock level seen last.
    Register {
        /// Current contents.
        value: Value,
        /// Clock level at the previous evaluation.
        last_clock: Bit,
    },
    /// The value an input pin drives into its circuit.
    Pin {
        /// Driven value.
        value: Value,
    },
    /// Current clock level.
    Clock {
        /// Output level.
        level: Bit,
    },
    /// The child state of a sub-circuit instance.
    Subcircuit {
        /// Child state ID.
        child: StateId,
    },
}

impl InstanceData {
    /// Copies stored contents from `old` when both describe the same kind of
    /// storage at the same width. Sub-circuit links are never copied.
    fn carry_over(&mut self, old: &InstanceData) {
        match (self, old) {
            (
                InstanceData::Register { value, last_clock },
                InstanceData::Register {
                    value: old_value,
                    last_clock: old_clock,
                },
            ) if value.width() == old_value.width() => {
                *value = old_value.clone();
                *last_clock = *old_clock;
            }
            (InstanceData::Pin { value }, InstanceData::Pin { value: old_value })
                if value.width() == old_value.width() =>
            {
                *value = old_value.clone();
            }
            (InstanceData::Clock { level }, InstanceData::Clock { level: old_level }) => {
                *level = *old_level;
            }
            _ => {}
        }
    }
}

/// The level a clock drives at `tick`: low for the first `low_ticks` of each
/// period, then high for `high_ticks`.
pub fn clock_level(tick: u64, high_ticks: u32, low_ticks: u32) -> Bit {
    let period = u64::from(high_ticks) + u64::from(low_ticks);
    if period == 0 {
        return Bit::Unknown;
    }
    Bit::from_bool(tick % period >= u64::from(low_ticks))
}

/// Runtime state of one circuit instance.
#[derive(Clone, Debug)]
pub struct CircuitState {
    circuit: CircuitId,
    parent: Option<(StateId, ComponentId)>,
    path: String,
    key: Vec<ComponentId>,
    netlist: Arc<Netlist>,
    nets: Vec<NetState>,
    data: BTreeMap<ComponentId, InstanceData>,
}

impl CircuitState {
    /// The circuit this state instantiates.
    pub fn circuit(&self) -> CircuitId {
        self.circuit
    }

    /// The parent state and the sub-circuit component owning this state.
    /// `None` for the root.
    pub fn parent(&self) -> Option<(StateId, ComponentId)> {
        self.parent
    }

    /// Hierarchical name, e.g. `main:alu:adder`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The netlist the net states are indexed by.
    pub fn netlist(&self) -> &Arc<Netlist> {
        &self.netlist
    }

    /// Resolved value of `net`.
    pub fn get(&self, net: NetId) -> Option<&Value> {
        self.net(net).map(NetState::value)
    }

    /// Full runtime state of `net`.
    pub fn net(&self, net: NetId) -> Option<&NetState> {
        self.nets.get(net.as_raw() as usize)
    }

    pub(crate) fn net_mut(&mut self, net: NetId) -> Option<&mut NetState> {
        self.nets.get_mut(net.as_raw() as usize)
    }

    /// Resolved values of every net, in net ID order.
    pub fn net_values(&self) -> impl Iterator<Item = &Value> {
        self.nets.iter().map(NetState::value)
    }

    /// The value `pin` reads: its net's value adapted to the port width.
    ///
    /// Where the port is wider than the net, the extra bits read as `Error`.
    pub fn pin_value(&self, pin: PinRef) -> Option<Value> {
        let port = self.netlist.ports(pin.component).get(pin.port as usize)?;
        let net = self.netlist.net_of(pin)?;
        Some(self.get(net)?.resize_to(port.width))
    }

    /// Stored data of a stateful component.
    pub fn data(&self, component: ComponentId) -> Option<&InstanceData> {
        self.data.get(&component)
    }

    pub(crate) fn data_mut(&mut self, component: ComponentId) -> Option<&mut InstanceData> {
        self.data.get_mut(&component)
    }

    /// The child state of a sub-circuit component.
    pub fn child(&self, component: ComponentId) -> Option<StateId> {
        match self.data.get(&component) {
            Some(InstanceData::Subcircuit { child }) => Some(*child),
            _ => None,
        }
    }

    /// Every `(component, child state)` pair.
    pub fn children(&self) -> impl Iterator<Item = (ComponentId, StateId)> + '_ {
        self.data.iter().filter_map(|(id, d)| match d {
            InstanceData::Subcircuit { child } => Some((*id, *child)),
            _ => None,
        })
    }
}

/// How states of a previous tree map onto a rebuilt one.
#[derive(Debug, Default)]
pub(crate) struct Rebuild {
    /// Old state ID to new state ID, for states whose nets were carried over.
    pub(crate) carried: HashMap<StateId, StateId>,
    /// New states that start from scratch and must be fully re-evaluated.
    pub(crate) fresh: Vec<StateId>,
}

/// All circuit states of a running simulation.
#[derive(Clone, Debug)]
pub struct StateTree {
    states: Arena<StateId, CircuitState>,
    root: StateId,
}

impl StateTree {
    /// Instantiates the design's top circuit and, recursively, every
    /// sub-circuit. All nets start `Unknown`; clocks take their level at `tick`.
    pub fn build(design: &Design, pin_default: PinDefault, tick: u64) -> Result<Self, SimError> {
        let top = design.top().ok_or(SimError::NoTopCircuit)?;
        let path = design
            .circuit(top)
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        let mut builder = Instantiator {
            design,
            pin_default,
            tick,
            states: Arena::new(),
        };
        let root = builder.instantiate(top, None, path, Vec::new())?;
        Ok(Self {
            states: builder.states,
            root,
        })
    }

    /// The root state.
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Looks up a state.
    pub fn get(&self, id: StateId) -> Option<&CircuitState> {
        self.states.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: StateId) -> Option<&mut CircuitState> {
        self.states.get_mut(id)
    }

    /// Iterates over all states, parents before children.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &CircuitState)> {
        self.states.iter()
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The parent of `id`, or `None` for the root.
    pub fn parent_state(&self, id: StateId) -> Option<StateId> {
        self.states.get(id)?.parent.map(|(p, _)| p)
    }

    /// Finds a state by hierarchical path.
    pub fn find_path(&self, path: &str) -> Option<StateId> {
        self.states
            .iter()
            .find(|(_, s)| s.path == path)
            .map(|(id, _)| id)
    }

    /// Recomputes every path from the current circuit names and instance
    /// labels. Nets and component storage are untouched.
    pub(crate) fn refresh_paths(&mut self, design: &Design) {
        let ids: Vec<StateId> = self.states.ids().collect();
        for id in ids {
            let Some(state) = self.states.get(id) else {
                continue;
            };
            let path = match state.parent {
                None => design.circuit(state.circuit).map(|c| c.name().to_string()),
                Some((parent, component)) => self.states.get(parent).and_then(|p| {
                    let instance = design.circuit(p.circuit)?.component(component)?;
                    let segment = instance_segment(design, component, instance);
                    Some(format!("{}:{segment}", p.path))
                }),
            };
            if let (Some(path), Some(state)) = (path, self.states.get_mut(id)) {
                state.path = path;
            }
        }
    }

    /// Deep-copies the subtree rooted at `id` into a detached tree whose root
    /// is the copy of `id`.
    pub fn clone_state(&self, id: StateId) -> Option<StateTree> {
        self.states.get(id)?;
        let mut states = Arena::new();
        let root = self.copy_subtree(id, None, &mut states)?;
        Some(StateTree { states, root })
    }

    fn copy_subtree(
        &self,
        id: StateId,
        parent: Option<(StateId, ComponentId)>,
        into: &mut Arena<StateId, CircuitState>,
    ) -> Option<StateId> {
        let mut state = self.states.get(id)?.clone();
        state.parent = parent;
        let children: Vec<(ComponentId, StateId)> = state.children().collect();
        let new_id = into.alloc(state);
        for (component, child) in children {
            let copied = self.copy_subtree(child, Some((new_id, component)), into)?;
            if let Some(data) = into.get_mut(new_id).and_then(|s| s.data_mut(component)) {
                *data = InstanceData::Subcircuit { child: copied };
            }
        }
        Some(new_id)
    }

    /// Builds a new tree for the edited design, keeping what is still valid.
    ///
    /// States are matched by their position in the hierarchy. A state whose
    /// circuit is not in `invalidated` keeps its nets. Component storage
    /// (register contents, poked pin values, clock levels) is kept wherever
    /// the component still exists with the same kind and width.
    pub(crate) fn rebuild(
        &self,
        design: &Design,
        invalidated: &HashSet<CircuitId>,
        pin_default: PinDefault,
        tick: u64,
    ) -> Result<(StateTree, Rebuild), SimError> {
        let mut tree = StateTree::build(design, pin_default, tick)?;
        let by_key: HashMap<&[ComponentId], StateId> = self
            .states
            .iter()
            .map(|(id, s)| (s.key.as_slice(), id))
            .collect();
        let mut rebuild = Rebuild::default();
        for (new_id, state) in tree.states.iter_mut() {
            let Some(old) = by_key
                .get(state.key.as_slice())
                .and_then(|id| self.states.get(*id).map(|s| (*id, s)))
                .filter(|(_, s)| s.circuit == state.circuit)
            else {
                rebuild.fresh.push(new_id);
                continue;
            };
            let (old_id, old) = old;
            for (component, data) in state.data.iter_mut() {
                if let Some(old_data) = old.data.get(component) {
                    data.carry_over(old_data);
                }
            }
            if !invalidated.contains(&state.circuit) && old.nets.len() == state.nets.len() {
                state.nets = old.nets.clone();
                rebuild.carried.insert(old_id, new_id);
            } else {
                rebuild.fresh.push(new_id);
            }
        }
        Ok((tree, rebuild))
    }
}

/// The path segment naming a sub-circuit instance: its label, or the child
/// circuit's name followed by the component ID.
fn instance_segment(design: &Design, id: ComponentId, component: &Component) -> String {
    match (&component.label, component.kind.subcircuit()) {
        (Some(label), _) => label.clone(),
        (None, child) => {
            let name = child
                .and_then(|c| design.circuit(c))
                .map_or("?", |c| c.name());
            format!("{name}{id}")
        }
    }
}

struct Instantiator<'a> {
    design: &'a Design,
    pin_default: PinDefault,
    tick: u64,
    states: Arena<StateId, CircuitState>,
}

impl Instantiator<'_> {
    fn instantiate(
        &mut self,
        circuit_id: CircuitId,
        parent: Option<(StateId, ComponentId)>,
        path: String,
        key: Vec<ComponentId>,
    ) -> Result<StateId, SimError> {
        let design = self.design;
        let circuit = design
            .circuit(circuit_id)
            .ok_or(StructuralError::UnknownCircuit(circuit_id))?;
        let netlist = design.netlist(circuit_id)?;
        let nets = netlist.nets().map(|(_, net)| NetState::new(net.width)).collect();
        let is_root = parent.is_none();

        let mut data = BTreeMap::new();
        let mut children = Vec::new();
        for (id, component) in circuit.components() {
            let entry = match &component.kind {
                ComponentKind::Register { width } => InstanceData::Register {
                    value: Value::zeros(*width),
                    last_clock: Bit::Unknown,
                },
                ComponentKind::Pin {
                    width,
                    direction: PinDirection::Input,
                } => {
                    let value = match (is_root, self.pin_default) {
                        (true, PinDefault::Zero) => Value::zeros(*width),
                        _ => Value::unknown(*width),
                    };
                    InstanceData::Pin { value }
                }
                ComponentKind::Clock {
                    high_ticks,
                    low_ticks,
                } => InstanceData::Clock {
                    level: clock_level(self.tick, *high_ticks, *low_ticks),
                },
                ComponentKind::Subcircuit { circuit: child } => {
                    let segment = instance_segment(design, id, component);
                    children.push((id, *child, format!("{path}:{segment}")));
                    continue;
                }
                _ => continue,
            };
            data.insert(id, entry);
        }

        let state_id = self.states.alloc(CircuitState {
            circuit: circuit_id,
            parent,
            path,
            key: key.clone(),
            netlist,
            nets,
            data,
        });

        for (component, child_circuit, child_path) in children {
            let mut child_key = key.clone();
            child_key.push(component);
            let child = self.instantiate(
                child_circuit,
                Some((state_id, component)),
                child_path,
                child_key,
            )?;
            if let Some(state) = self.states.get_mut(state_id) {
                state
                    .data
                    .insert(component, InstanceData::Subcircuit { child });
            }
        }
        Ok(state_id)
    }
}
