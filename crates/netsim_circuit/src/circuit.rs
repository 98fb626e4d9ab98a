//! A single circuit: its component instances, wires and cached netlist.

use crate::arena::Arena;
use crate::component::{Component, ComponentKind, PinDirection};
use crate::geom::{Bounds, Location};
use crate::ids::{CircuitId, ComponentId, WireId};
use crate::netlist::Netlist;
use crate::wire::Wire;
use std::sync::{Arc, OnceLock};

/// A named set of components and the wires between their ports.
///
/// Circuits are mutated only through [`Design::apply`](crate::Design::apply),
/// which keeps containment acyclic and invalidates derived netlists.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    components: Arena<ComponentId, Component>,
    wires: Arena<WireId, Wire>,
    netlist: OnceLock<Arc<Netlist>>,
}

impl Circuit {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Arena::new(),
            wires: Arena::new(),
            netlist: OnceLock::new(),
        }
    }

    /// The circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a component.
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    /// Iterates over components in ID order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components.iter()
    }

    /// Number of live components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Looks up a wire.
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(id)
    }

    /// Iterates over wires in ID order.
    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter()
    }

    /// Finds a component by label.
    pub fn find_label(&self, label: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|(_, c)| c.label.as_deref() == Some(label))
            .map(|(id, _)| id)
    }

    /// Union of all component footprints; `None` for an empty circuit.
    pub fn bounds(&self) -> Option<Bounds> {
        self.components
            .values()
            .map(Component::bounds)
            .reduce(Bounds::union)
    }

    /// The `Pin` components forming this circuit's interface, in component order.
    pub fn interface_pins(&self) -> impl Iterator<Item = (ComponentId, u32, PinDirection)> + '_ {
        self.components.iter().filter_map(|(id, c)| match c.kind {
            ComponentKind::Pin { width, direction } => Some((id, width, direction)),
            _ => None,
        })
    }

    /// Circuits instantiated directly by this one.
    pub fn children(&self) -> impl Iterator<Item = CircuitId> + '_ {
        self.components.values().filter_map(|c| c.kind.subcircuit())
    }

    pub(crate) fn cached_netlist(&self) -> &OnceLock<Arc<Netlist>> {
        &self.netlist
    }

    pub(crate) fn invalidate(&mut self) {
        self.netlist = OnceLock::new();
    }

    pub(crate) fn insert_component(&mut self, component: Component) -> ComponentId {
        self.components.alloc(component)
    }

    /// Removes a component together with every wire touching it.
    pub(crate) fn remove_component(
        &mut self,
        id: ComponentId,
    ) -> Option<(Component, Vec<WireId>)> {
        let component = self.components.remove(id)?;
        let attached: Vec<WireId> = self
            .wires
            .iter()
            .filter(|(_, w)| w.touches(id))
            .map(|(wid, _)| wid)
            .collect();
        for wid in &attached {
            self.wires.remove(*wid);
        }
        Some((component, attached))
    }

    pub(crate) fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.get_mut(id)
    }

    /// Drops wires attached to `id` at port indices `>= port_count`.
    pub(crate) fn prune_wires(&mut self, id: ComponentId, port_count: usize) -> Vec<WireId> {
        let stale: Vec<WireId> = self
            .wires
            .iter()
            .filter(|(_, w)| {
                w.ends()
                    .iter()
                    .any(|end| end.component == id && end.port as usize >= port_count)
            })
            .map(|(wid, _)| wid)
            .collect();
        for wid in &stale {
            self.wires.remove(*wid);
        }
        stale
    }

    /// Rewrites the port index of every wire end on a component for which
    /// `instance` holds. An end that `remap` sends to `None` drops its wire.
    pub(crate) fn remap_ports(
        &mut self,
        instance: impl Fn(ComponentId) -> bool,
        remap: impl Fn(u32) -> Option<u32>,
    ) -> Vec<WireId> {
        let mut dropped = Vec::new();
        for (wid, wire) in self.wires.iter_mut() {
            for end in [&mut wire.a, &mut wire.b] {
                if !instance(end.component) {
                    continue;
                }
                match remap(end.port) {
                    Some(port) => end.port = port,
                    None => {
                        if dropped.last() != Some(&wid) {
                            dropped.push(wid);
                        }
                    }
                }
            }
        }
        for wid in &dropped {
            self.wires.remove(*wid);
        }
        dropped
    }

    pub(crate) fn insert_wire(&mut self, wire: Wire) -> WireId {
        self.wires.alloc(wire)
    }

    pub(crate) fn remove_wire(&mut self, id: WireId) -> Option<Wire> {
        self.wires.remove(id)
    }

    pub(crate) fn set_location(&mut self, id: ComponentId, location: Location) -> Option<Location> {
        let component = self.components.get_mut(id)?;
        Some(std::mem::replace(&mut component.location, location))
    }

    pub(crate) fn set_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }
}
