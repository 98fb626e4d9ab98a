//! The design: every circuit, the top circuit, and transactional editing.
//!
//! All structural mutation funnels through [`Design::apply`]. A transaction
//! is applied to a working copy of the edited circuit; only when every edit
//! succeeds and sub-circuit containment is still acyclic is the copy
//! committed. Committing discards the cached netlist of the edited circuit
//! and of every circuit that instantiates it, since sub-circuit port lists
//! are derived from the child's pins. When the pin list itself changes,
//! wires on instances of the circuit are renumbered to follow their pins in
//! the same commit, and wires on deleted pins are removed.

use crate::arena::Arena;
use crate::circuit::Circuit;
use crate::component::{Component, ComponentKind, PinDirection};
use crate::edit::{CircuitEvent, Edit, Transaction, TransactionResult};
use crate::error::StructuralError;
use crate::geom::Location;
use crate::ids::{CircuitId, ComponentId, WireId};
use crate::netlist::Netlist;
use crate::port::PortSpec;
use crate::wire::{PinRef, Wire};
use netsim_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Locus};
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// A library of circuits with one designated top circuit.
#[derive(Debug, Clone, Default)]
pub struct Design {
    circuits: Arena<CircuitId, Circuit>,
    top: Option<CircuitId>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty circuit. The first circuit added becomes the top.
    pub fn add_circuit(&mut self, name: impl Into<String>) -> Result<CircuitId, StructuralError> {
        let name = name.into();
        self.check_name(&name, None)?;
        let id = self.circuits.alloc(Circuit::new(name));
        if self.top.is_none() {
            self.top = Some(id);
        }
        Ok(id)
    }

    /// Looks up a circuit.
    pub fn circuit(&self, id: CircuitId) -> Option<&Circuit> {
        self.circuits.get(id)
    }

    /// Iterates over all circuits in ID order.
    pub fn circuits(&self) -> impl Iterator<Item = (CircuitId, &Circuit)> {
        self.circuits.iter()
    }

    /// Finds a circuit by name.
    pub fn find_circuit(&self, name: &str) -> Option<CircuitId> {
        self.circuits
            .iter()
            .find(|(_, c)| c.name() == name)
            .map(|(id, _)| id)
    }

    /// The circuit simulated at the root of the hierarchy.
    pub fn top(&self) -> Option<CircuitId> {
        self.top
    }

    /// Chooses the top circuit.
    pub fn set_top(&mut self, id: CircuitId) -> Result<(), StructuralError> {
        if !self.circuits.contains(id) {
            return Err(StructuralError::UnknownCircuit(id));
        }
        self.top = Some(id);
        Ok(())
    }

    fn get(&self, id: CircuitId) -> Result<&Circuit, StructuralError> {
        self.circuits
            .get(id)
            .ok_or(StructuralError::UnknownCircuit(id))
    }

    // -- ports ------------------------------------------------------------

    /// The port list of a component kind. A sub-circuit of a missing circuit
    /// has no ports.
    pub fn ports_of(&self, kind: &ComponentKind) -> Vec<PortSpec> {
        match kind.leaf_ports() {
            Some(ports) => ports,
            None => kind
                .subcircuit()
                .map(|child| self.interface(child))
                .unwrap_or_default(),
        }
    }

    /// The ports an instance of `circuit` exposes: one per `Pin`, in
    /// component order, named after the pin label.
    pub fn interface(&self, circuit: CircuitId) -> Vec<PortSpec> {
        self.circuits
            .get(circuit)
            .map(interface_of)
            .unwrap_or_default()
    }

    /// The `Pin` component behind each interface port of `circuit`.
    pub fn interface_pins(&self, circuit: CircuitId) -> Vec<ComponentId> {
        self.circuits
            .get(circuit)
            .map(|c| c.interface_pins().map(|(id, _, _)| id).collect())
            .unwrap_or_default()
    }

    // -- netlists ---------------------------------------------------------

    /// The netlist of `circuit`, built on first use and cached until the
    /// circuit or one of its sub-circuits changes.
    pub fn netlist(&self, circuit: CircuitId) -> Result<Arc<Netlist>, StructuralError> {
        let c = self.get(circuit)?;
        let netlist = c.cached_netlist().get_or_init(|| {
            let ports: BTreeMap<ComponentId, Vec<PortSpec>> = c
                .components()
                .map(|(id, comp)| (id, self.ports_of(&comp.kind)))
                .collect();
            Arc::new(Netlist::build(ports, c.wires().map(|(_, w)| w)))
        });
        Ok(Arc::clone(netlist))
    }

    // -- containment ------------------------------------------------------

    fn containment_graph(
        &self,
        replaced: Option<(CircuitId, &Circuit)>,
    ) -> (DiGraph<CircuitId, ()>, HashMap<CircuitId, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for id in self.circuits.ids() {
            nodes.insert(id, graph.add_node(id));
        }
        for (id, circuit) in self.circuits.iter() {
            let circuit = match replaced {
                Some((rid, working)) if rid == id => working,
                _ => circuit,
            };
            for child in circuit.children() {
                if let (Some(&from), Some(&to)) = (nodes.get(&id), nodes.get(&child)) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        (graph, nodes)
    }

    /// Every circuit that instantiates `circuit`, directly or transitively.
    pub fn instantiators(&self, circuit: CircuitId) -> Vec<CircuitId> {
        let (graph, nodes) = self.containment_graph(None);
        let Some(&start) = nodes.get(&circuit) else {
            return Vec::new();
        };
        let reversed = Reversed(&graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(node) = dfs.next(reversed) {
            if node != start {
                found.push(graph[node]);
            }
        }
        found.sort();
        found
    }

    fn check_containment(
        &self,
        circuit: CircuitId,
        working: &Circuit,
    ) -> Result<(), StructuralError> {
        let (graph, nodes) = self.containment_graph(Some((circuit, working)));
        if !is_cyclic_directed(&graph) {
            return Ok(());
        }
        let parent = nodes[&circuit];
        let offender = working
            .children()
            .find(|child| {
                nodes
                    .get(child)
                    .is_some_and(|&n| has_path_connecting(&graph, n, parent, None))
            })
            .unwrap_or(circuit);
        Err(StructuralError::CyclicContainment {
            parent: working.name().to_string(),
            child: self
                .circuits
                .get(offender)
                .map_or_else(|| working.name().to_string(), |c| c.name().to_string()),
        })
    }

    fn check_name(&self, name: &str, except: Option<CircuitId>) -> Result<(), StructuralError> {
        let taken = self
            .circuits
            .iter()
            .any(|(id, c)| Some(id) != except && c.name() == name);
        if name.trim().is_empty() || taken {
            return Err(StructuralError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn check_kind(&self, kind: &ComponentKind) -> Result<(), StructuralError> {
        kind.validate()?;
        if let Some(child) = kind.subcircuit() {
            self.get(child)?;
        }
        Ok(())
    }

    fn check_pin(&self, working: &Circuit, pin: PinRef) -> Result<(), StructuralError> {
        let component = working
            .component(pin.component)
            .ok_or(StructuralError::UnknownComponent(pin.component))?;
        let ports = self.ports_of(&component.kind).len();
        if pin.port as usize >= ports {
            return Err(StructuralError::PortOutOfRange {
                component: pin.component,
                port: pin.port,
                ports,
            });
        }
        Ok(())
    }

    // -- transactions -----------------------------------------------------

    /// Applies a transaction atomically to `circuit`.
    ///
    /// On error nothing changes. On success the returned events list every
    /// change in order, followed by one `Invalidated` per circuit whose
    /// derived data was discarded and a final `TransactionDone`.
    pub fn apply(
        &mut self,
        circuit: CircuitId,
        transaction: &Transaction,
    ) -> Result<TransactionResult, StructuralError> {
        let original = self.get(circuit)?;
        let mut working = original.clone();
        let mut events = Vec::new();
        for edit in transaction.edits() {
            self.apply_edit(circuit, &mut working, edit, &mut events)?;
        }
        self.check_containment(circuit, &working)?;

        let interface_changed = interface_of(original) != interface_of(&working);
        let rewired = if interface_changed {
            let old_pins: Vec<ComponentId> = original.interface_pins().map(|(id, _, _)| id).collect();
            self.rewire_instances(circuit, &old_pins, &working)
        } else {
            Vec::new()
        };

        let structural = interface_changed || transaction.edits().iter().any(Edit::is_structural);
        let invalidated = if structural {
            let mut affected = vec![circuit];
            affected.extend(self.instantiators(circuit));
            affected
        } else {
            Vec::new()
        };

        if structural {
            working.invalidate();
        }
        self.circuits[circuit] = working;
        for (parent, updated, wires) in rewired {
            self.circuits[parent] = updated;
            if !wires.is_empty() {
                events.push(CircuitEvent::InstanceWiresRemoved {
                    circuit: parent,
                    wires,
                });
            }
        }
        for &id in &invalidated {
            if let Some(c) = self.circuits.get_mut(id) {
                c.invalidate();
            }
            events.push(CircuitEvent::Invalidated { circuit: id });
        }
        events.push(CircuitEvent::TransactionDone { circuit });

        Ok(TransactionResult {
            circuit,
            events,
            invalidated,
        })
    }

    /// Copies of every circuit holding an instance of `circuit`, with the
    /// wires on those instances renumbered from `old_pins` to the pin order
    /// of `working`. Wires on pins that no longer exist are dropped.
    fn rewire_instances(
        &self,
        circuit: CircuitId,
        old_pins: &[ComponentId],
        working: &Circuit,
    ) -> Vec<(CircuitId, Circuit, Vec<WireId>)> {
        let new_pins: Vec<ComponentId> = working.interface_pins().map(|(id, _, _)| id).collect();
        let remap = |port: u32| {
            let pin = old_pins.get(port as usize)?;
            let index = new_pins.iter().position(|p| p == pin)?;
            u32::try_from(index).ok()
        };
        self.circuits
            .iter()
            .filter(|(id, _)| *id != circuit)
            .filter_map(|(id, parent)| {
                let instances: HashSet<ComponentId> = parent
                    .components()
                    .filter(|(_, c)| c.kind.subcircuit() == Some(circuit))
                    .map(|(cid, _)| cid)
                    .collect();
                if instances.is_empty() {
                    return None;
                }
                let mut updated = parent.clone();
                let dropped = updated.remap_ports(|c| instances.contains(&c), &remap);
                log::debug!(
                    "renumbered ports of {} instance(s) in '{}', dropped {} wire(s)",
                    instances.len(),
                    parent.name(),
                    dropped.len()
                );
                Some((id, updated, dropped))
            })
            .collect()
    }

    fn apply_edit(
        &self,
        circuit: CircuitId,
        working: &mut Circuit,
        edit: &Edit,
        events: &mut Vec<CircuitEvent>,
    ) -> Result<(), StructuralError> {
        match edit {
            Edit::AddComponent {
                kind,
                location,
                label,
            } => {
                self.check_kind(kind)?;
                let id = working.insert_component(Component {
                    kind: kind.clone(),
                    location: *location,
                    label: label.clone(),
                });
                events.push(CircuitEvent::ComponentAdded { component: id });
            }
            Edit::RemoveComponent { component } => {
                let (_, wires) = working
                    .remove_component(*component)
                    .ok_or(StructuralError::UnknownComponent(*component))?;
                events.extend(wires.into_iter().map(|wire| CircuitEvent::WireRemoved { wire }));
                events.push(CircuitEvent::ComponentRemoved {
                    component: *component,
                });
            }
            Edit::MoveComponent {
                component,
                location,
            } => {
                let from = working
                    .set_location(*component, *location)
                    .ok_or(StructuralError::UnknownComponent(*component))?;
                events.push(CircuitEvent::ComponentMoved {
                    component: *component,
                    from,
                    to: *location,
                });
            }
            Edit::SetAttributes { component, kind } => {
                self.check_kind(kind)?;
                let port_count = self.ports_of(kind).len();
                let target = working
                    .component_mut(*component)
                    .ok_or(StructuralError::UnknownComponent(*component))?;
                target.kind = kind.clone();
                let pruned = working.prune_wires(*component, port_count);
                events.extend(pruned.into_iter().map(|wire| CircuitEvent::WireRemoved { wire }));
                events.push(CircuitEvent::AttributesChanged {
                    component: *component,
                });
            }
            Edit::SetLabel { component, label } => {
                let target = working
                    .component_mut(*component)
                    .ok_or(StructuralError::UnknownComponent(*component))?;
                target.label = label.clone();
                events.push(CircuitEvent::LabelChanged {
                    component: *component,
                });
            }
            Edit::AddWire { a, b } => {
                self.check_pin(working, *a)?;
                self.check_pin(working, *b)?;
                let wire = working.insert_wire(Wire { a: *a, b: *b });
                events.push(CircuitEvent::WireAdded { wire });
            }
            Edit::RemoveWire { wire } => {
                working
                    .remove_wire(*wire)
                    .ok_or(StructuralError::UnknownWire(*wire))?;
                events.push(CircuitEvent::WireRemoved { wire: *wire });
            }
            Edit::Rename { name } => {
                self.check_name(name, Some(circuit))?;
                let from = working.set_name(name.clone());
                events.push(CircuitEvent::Renamed {
                    from,
                    to: name.clone(),
                });
            }
        }
        Ok(())
    }

    // -- single-edit conveniences -----------------------------------------

    /// Places a component and returns its ID.
    pub fn add_component(
        &mut self,
        circuit: CircuitId,
        kind: ComponentKind,
        location: Location,
    ) -> Result<ComponentId, StructuralError> {
        self.add_labeled_component(circuit, kind, location, None)
    }

    /// Places a labeled component and returns its ID.
    pub fn add_labeled_component(
        &mut self,
        circuit: CircuitId,
        kind: ComponentKind,
        location: Location,
        label: Option<&str>,
    ) -> Result<ComponentId, StructuralError> {
        let tx = Transaction::new().with(Edit::AddComponent {
            kind,
            location,
            label: label.map(str::to_string),
        });
        let result = self.apply(circuit, &tx)?;
        let id = result.added_components().next();
        id.ok_or(StructuralError::UnknownCircuit(circuit))
    }

    /// Deletes a component and its wires.
    pub fn remove_component(
        &mut self,
        circuit: CircuitId,
        component: ComponentId,
    ) -> Result<TransactionResult, StructuralError> {
        self.apply(circuit, &Transaction::new().with(Edit::RemoveComponent { component }))
    }

    /// Moves a component.
    pub fn move_component(
        &mut self,
        circuit: CircuitId,
        component: ComponentId,
        location: Location,
    ) -> Result<TransactionResult, StructuralError> {
        self.apply(
            circuit,
            &Transaction::new().with(Edit::MoveComponent {
                component,
                location,
            }),
        )
    }

    /// Replaces a component's attributes.
    pub fn set_attributes(
        &mut self,
        circuit: CircuitId,
        component: ComponentId,
        kind: ComponentKind,
    ) -> Result<TransactionResult, StructuralError> {
        self.apply(
            circuit,
            &Transaction::new().with(Edit::SetAttributes { component, kind }),
        )
    }

    /// Joins two pins and returns the wire ID.
    pub fn add_wire(
        &mut self,
        circuit: CircuitId,
        a: PinRef,
        b: PinRef,
    ) -> Result<WireId, StructuralError> {
        let result = self.apply(circuit, &Transaction::new().with(Edit::AddWire { a, b }))?;
        let id = result.added_wires().next();
        id.ok_or(StructuralError::UnknownCircuit(circuit))
    }

    /// Deletes a wire.
    pub fn remove_wire(
        &mut self,
        circuit: CircuitId,
        wire: WireId,
    ) -> Result<TransactionResult, StructuralError> {
        self.apply(circuit, &Transaction::new().with(Edit::RemoveWire { wire }))
    }

    /// Renames a circuit.
    pub fn rename(
        &mut self,
        circuit: CircuitId,
        name: impl Into<String>,
    ) -> Result<TransactionResult, StructuralError> {
        self.apply(
            circuit,
            &Transaction::new().with(Edit::Rename { name: name.into() }),
        )
    }

    // -- structural checks ------------------------------------------------

    /// Nets of `circuit` whose attached ports disagree on width, as `W101`
    /// warnings. The simulator runs such nets at the narrowest width.
    pub fn width_warnings(&self, circuit: CircuitId) -> Result<Vec<Diagnostic>, StructuralError> {
        let name = self.get(circuit)?.name().to_string();
        let netlist = self.netlist(circuit)?;
        Ok(netlist
            .width_conflicts()
            .map(|(id, net)| {
                let mut widths: Vec<u32> = net
                    .pins
                    .iter()
                    .filter_map(|p| netlist.ports(p.component).get(p.port as usize))
                    .map(|spec| spec.width)
                    .collect();
                widths.sort_unstable_by(|a, b| b.cmp(a));
                widths.dedup();
                let list = widths
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                Diagnostic::warning(
                    DiagnosticCode::WIDTH_MISMATCH,
                    format!("ports of widths {list} wired together"),
                    Locus::Net {
                        circuit: name.clone(),
                        net: id.as_raw(),
                    },
                )
                .with_note(format!("the net is simulated at {} bits", net.width))
                .with_help("wider readers see the missing high bits as errors")
            })
            .collect())
    }

    /// Runs every structural check on `circuit` and reports into `sink`.
    pub fn check(&self, circuit: CircuitId, sink: &DiagnosticSink) -> Result<(), StructuralError> {
        sink.extend(self.width_warnings(circuit)?);
        let c = self.get(circuit)?;
        for (id, component) in c.components() {
            if let Some(child) = component.kind.subcircuit() {
                if self.interface(child).is_empty() {
                    let child_name = self.get(child)?.name();
                    sink.emit(Diagnostic::warning(
                        DiagnosticCode::EMPTY_INTERFACE,
                        format!("instance of `{child_name}` has no pins to connect"),
                        Locus::Component {
                            circuit: c.name().to_string(),
                            component: id.as_raw(),
                        },
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Ports exposed by instances of `c`, named after the pin labels.
fn interface_of(c: &Circuit) -> Vec<PortSpec> {
    c.interface_pins()
        .map(|(id, width, direction)| {
            let name = c
                .component(id)
                .and_then(|p| p.label.clone())
                .unwrap_or_else(|| format!("pin{}", id.as_raw()));
            match direction {
                PinDirection::Input => PortSpec::input(name, width),
                PinDirection::Output => PortSpec::output(name, width),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::GateOp;

    fn input(width: u32) -> ComponentKind {
        ComponentKind::Pin {
            width,
            direction: PinDirection::Input,
        }
    }

    fn output(width: u32) -> ComponentKind {
        ComponentKind::Pin {
            width,
            direction: PinDirection::Output,
        }
    }

    fn at() -> Location {
        Location::default()
    }

    #[test]
    fn first_circuit_is_top() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        d.add_circuit("sub").unwrap();
        assert_eq!(d.top(), Some(main));
        assert_eq!(d.find_circuit("sub").map(|c| c.as_raw()), Some(1));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut d = Design::new();
        d.add_circuit("main").unwrap();
        assert_eq!(
            d.add_circuit("main"),
            Err(StructuralError::InvalidName("main".into()))
        );
        assert!(d.add_circuit("  ").is_err());
    }

    #[test]
    fn netlist_is_cached_until_edit() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let a = d.add_component(main, input(1), at()).unwrap();
        let first = d.netlist(main).unwrap();
        assert!(Arc::ptr_eq(&first, &d.netlist(main).unwrap()));
        let p = d.add_component(main, output(1), at()).unwrap();
        let second = d.netlist(main).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        d.add_wire(main, PinRef::new(a, 0), PinRef::new(p, 0)).unwrap();
        assert_eq!(d.netlist(main).unwrap().len(), 1);
    }

    #[test]
    fn move_keeps_netlist_cache() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let a = d.add_component(main, input(1), at()).unwrap();
        let before = d.netlist(main).unwrap();
        let result = d.move_component(main, a, Location::new(50, 50)).unwrap();
        assert!(result.invalidated.is_empty());
        assert!(Arc::ptr_eq(&before, &d.netlist(main).unwrap()));
    }

    #[test]
    fn relabel_and_rename_keep_netlist_cache() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let n = d.add_component(main, ComponentKind::Not { width: 1 }, at()).unwrap();
        let before = d.netlist(main).unwrap();
        let tx = Transaction::new()
            .with(Edit::SetLabel {
                component: n,
                label: Some("inv".into()),
            })
            .with(Edit::Rename { name: "top".into() });
        let result = d.apply(main, &tx).unwrap();
        assert!(result.invalidated.is_empty());
        assert!(Arc::ptr_eq(&before, &d.netlist(main).unwrap()));
        assert_eq!(d.circuit(main).unwrap().find_label("inv"), Some(n));
    }

    /// `alu` exposes `a`, `b` and `y`; `main` drives `b` from a constant and
    /// watches `y`.
    fn instance_with_wires() -> (Design, CircuitId, CircuitId, [ComponentId; 3], [WireId; 2]) {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let alu = d.add_circuit("alu").unwrap();
        let a = d.add_labeled_component(alu, input(1), at(), Some("a")).unwrap();
        let b = d.add_labeled_component(alu, input(1), at(), Some("b")).unwrap();
        d.add_labeled_component(alu, output(1), at(), Some("y")).unwrap();

        let one = d
            .add_component(
                main,
                ComponentKind::Constant {
                    value: netsim_common::Value::from_bool(true),
                },
                at(),
            )
            .unwrap();
        let inst = d
            .add_component(main, ComponentKind::Subcircuit { circuit: alu }, at())
            .unwrap();
        let watch = d.add_component(main, ComponentKind::Probe { width: 1 }, at()).unwrap();
        let to_b = d.add_wire(main, PinRef::new(one, 0), PinRef::new(inst, 1)).unwrap();
        let from_y = d.add_wire(main, PinRef::new(inst, 2), PinRef::new(watch, 0)).unwrap();
        (d, main, alu, [a, b, inst], [to_b, from_y])
    }

    #[test]
    fn removed_child_pin_renumbers_instance_wires() {
        let (mut d, main, alu, [a, _, inst], [to_b, from_y]) = instance_with_wires();
        let result = d.remove_component(alu, a).unwrap();
        assert!(result.invalidated.contains(&main));
        assert!(!result
            .events
            .iter()
            .any(|e| matches!(e, CircuitEvent::InstanceWiresRemoved { .. })));

        let parent = d.circuit(main).unwrap();
        assert_eq!(parent.wire(to_b).unwrap().b, PinRef::new(inst, 0));
        assert_eq!(parent.wire(from_y).unwrap().a, PinRef::new(inst, 1));

        let netlist = d.netlist(main).unwrap();
        assert_eq!(netlist.ports(inst).len(), 2);
        assert_eq!(netlist.ports(inst)[0].name, "b");
        assert_ne!(
            netlist.net_of(PinRef::new(inst, 0)),
            netlist.net_of(PinRef::new(inst, 1))
        );
    }

    #[test]
    fn wires_on_deleted_child_pin_are_dropped() {
        let (mut d, main, alu, [_, b, inst], [to_b, from_y]) = instance_with_wires();
        let result = d.remove_component(alu, b).unwrap();
        assert!(result.events.contains(&CircuitEvent::InstanceWiresRemoved {
            circuit: main,
            wires: vec![to_b],
        }));
        let parent = d.circuit(main).unwrap();
        assert!(parent.wire(to_b).is_none());
        assert_eq!(parent.wire(from_y).unwrap().a, PinRef::new(inst, 1));
    }

    #[test]
    fn pin_relabel_refreshes_instance_ports() {
        let (mut d, main, alu, [a, _, inst], _) = instance_with_wires();
        d.netlist(main).unwrap();
        let tx = Transaction::new().with(Edit::SetLabel {
            component: a,
            label: Some("lhs".into()),
        });
        let result = d.apply(alu, &tx).unwrap();
        assert_eq!(result.invalidated, vec![alu, main]);
        assert_eq!(d.netlist(main).unwrap().ports(inst)[0].name, "lhs");
    }

    #[test]
    fn subcircuit_ports_follow_child_pins() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let sub = d.add_circuit("inv").unwrap();
        d.add_labeled_component(sub, input(4), at(), Some("a")).unwrap();
        d.add_component(sub, ComponentKind::Not { width: 4 }, at()).unwrap();
        d.add_labeled_component(sub, output(4), at(), Some("y")).unwrap();

        let ports = d.ports_of(&ComponentKind::Subcircuit { circuit: sub });
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].name, "a");
        assert_eq!(ports[0].direction, crate::PortDirection::Input);
        assert_eq!(ports[1].name, "y");
        assert_eq!(d.interface_pins(sub).len(), 2);

        let inst = d
            .add_component(main, ComponentKind::Subcircuit { circuit: sub }, at())
            .unwrap();
        assert_eq!(d.netlist(main).unwrap().ports(inst).len(), 2);
    }

    #[test]
    fn child_edit_invalidates_parents() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let mid = d.add_circuit("mid").unwrap();
        let leaf = d.add_circuit("leaf").unwrap();
        d.add_component(main, ComponentKind::Subcircuit { circuit: mid }, at())
            .unwrap();
        d.add_component(mid, ComponentKind::Subcircuit { circuit: leaf }, at())
            .unwrap();
        let inst = d.netlist(main).unwrap();

        let result = d
            .apply(
                leaf,
                &Transaction::new().with(Edit::AddComponent {
                    kind: input(1),
                    location: at(),
                    label: None,
                }),
            )
            .unwrap();
        assert_eq!(result.invalidated, vec![leaf, main, mid]);
        assert!(result
            .events
            .contains(&CircuitEvent::Invalidated { circuit: main }));
        assert_eq!(
            result.events.last(),
            Some(&CircuitEvent::TransactionDone { circuit: leaf })
        );
        assert!(!Arc::ptr_eq(&inst, &d.netlist(main).unwrap()));
        assert_eq!(d.instantiators(leaf), vec![main, mid]);
    }

    #[test]
    fn direct_self_instantiation_rejected() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let err = d
            .add_component(main, ComponentKind::Subcircuit { circuit: main }, at())
            .unwrap_err();
        assert!(matches!(err, StructuralError::CyclicContainment { .. }));
        assert_eq!(d.circuit(main).unwrap().component_count(), 0);
    }

    #[test]
    fn transitive_cycle_rejected_and_structure_kept() {
        let mut d = Design::new();
        let a = d.add_circuit("a").unwrap();
        let b = d.add_circuit("b").unwrap();
        d.add_component(a, ComponentKind::Subcircuit { circuit: b }, at())
            .unwrap();
        let before = d.circuit(b).unwrap().component_count();

        let tx = Transaction::new()
            .with(Edit::AddComponent {
                kind: ComponentKind::Probe { width: 1 },
                location: at(),
                label: None,
            })
            .with(Edit::AddComponent {
                kind: ComponentKind::Subcircuit { circuit: a },
                location: at(),
                label: None,
            });
        let err = d.apply(b, &tx).unwrap_err();
        assert_eq!(
            err,
            StructuralError::CyclicContainment {
                parent: "b".into(),
                child: "a".into()
            }
        );
        assert_eq!(d.circuit(b).unwrap().component_count(), before);
    }

    #[test]
    fn failed_edit_rolls_back_whole_transaction() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let tx = Transaction::new()
            .with(Edit::AddComponent {
                kind: ComponentKind::Not { width: 1 },
                location: at(),
                label: None,
            })
            .with(Edit::RemoveWire {
                wire: WireId::from_raw(3),
            });
        assert_eq!(
            d.apply(main, &tx),
            Err(StructuralError::UnknownWire(WireId::from_raw(3)))
        );
        assert_eq!(d.circuit(main).unwrap().component_count(), 0);
    }

    #[test]
    fn wire_to_missing_port_rejected() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let n = d.add_component(main, ComponentKind::Not { width: 1 }, at()).unwrap();
        let err = d
            .add_wire(main, PinRef::new(n, 0), PinRef::new(n, 2))
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::PortOutOfRange {
                component: n,
                port: 2,
                ports: 2
            }
        );
    }

    #[test]
    fn unknown_subcircuit_rejected() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let err = d
            .add_component(
                main,
                ComponentKind::Subcircuit {
                    circuit: CircuitId::from_raw(9),
                },
                at(),
            )
            .unwrap_err();
        assert_eq!(err, StructuralError::UnknownCircuit(CircuitId::from_raw(9)));
    }

    #[test]
    fn shrinking_gate_prunes_wires() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let g = d
            .add_component(
                main,
                ComponentKind::Gate {
                    op: GateOp::And,
                    width: 1,
                    inputs: 3,
                },
                at(),
            )
            .unwrap();
        let p = d.add_component(main, input(1), at()).unwrap();
        let w = d.add_wire(main, PinRef::new(p, 0), PinRef::new(g, 3)).unwrap();
        let result = d
            .set_attributes(
                main,
                g,
                ComponentKind::Gate {
                    op: GateOp::And,
                    width: 1,
                    inputs: 2,
                },
            )
            .unwrap();
        assert!(result.events.contains(&CircuitEvent::WireRemoved { wire: w }));
        assert!(d.circuit(main).unwrap().wire(w).is_none());
    }

    #[test]
    fn remove_component_reports_wires_first() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let a = d.add_component(main, input(1), at()).unwrap();
        let b = d.add_component(main, output(1), at()).unwrap();
        let w = d.add_wire(main, PinRef::new(a, 0), PinRef::new(b, 0)).unwrap();
        let result = d.remove_component(main, a).unwrap();
        assert_eq!(result.events[0], CircuitEvent::WireRemoved { wire: w });
        assert_eq!(
            result.events[1],
            CircuitEvent::ComponentRemoved { component: a }
        );
    }

    #[test]
    fn rename_emits_event() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let result = d.rename(main, "cpu").unwrap();
        assert_eq!(
            result.events[0],
            CircuitEvent::Renamed {
                from: "main".into(),
                to: "cpu".into()
            }
        );
        assert_eq!(d.find_circuit("cpu"), Some(main));
    }

    #[test]
    fn width_warning_reported() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let wide = d.add_component(main, input(4), at()).unwrap();
        let narrow = d.add_component(main, output(2), at()).unwrap();
        d.add_wire(main, PinRef::new(wide, 0), PinRef::new(narrow, 0))
            .unwrap();
        let warnings = d.width_warnings(main).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code.to_string(), "W101");
        assert_eq!(warnings[0].message, "ports of widths 4, 2 wired together");
    }

    #[test]
    fn check_reports_empty_interface() {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let empty = d.add_circuit("empty").unwrap();
        d.add_component(main, ComponentKind::Subcircuit { circuit: empty }, at())
            .unwrap();
        let sink = DiagnosticSink::new();
        d.check(main, &sink).unwrap();
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::EMPTY_INTERFACE);
    }
}
