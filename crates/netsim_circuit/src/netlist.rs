//! Partition of a circuit's pins into electrically equivalent nets.
//!
//! A [`Netlist`] is derived from a circuit's wires with a union-find over
//! every port endpoint. Each pin belongs to exactly one net; an unconnected
//! pin forms a net of its own. Net IDs follow the order in which their first
//! pin appears (components in allocation order, ports by index), so the same
//! circuit always yields the same numbering.

use crate::arena::Arena;
use crate::ids::{ComponentId, NetId};
use crate::port::PortSpec;
use crate::wire::{PinRef, Wire};
use petgraph::unionfind::UnionFind;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One net: a maximal set of joined pins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Net {
    /// Every pin on the net, in component then port order.
    pub pins: Vec<PinRef>,
    /// Pins that assert a value onto the net.
    pub drivers: Vec<PinRef>,
    /// Pins that observe the net.
    pub readers: Vec<PinRef>,
    /// Declared width: the narrowest attached port.
    pub width: u32,
    /// Attached ports disagree on width.
    pub width_conflict: bool,
}

/// Nets of one circuit plus the port lists they were built from.
#[derive(Clone, Debug, Default)]
pub struct Netlist {
    nets: Arena<NetId, Net>,
    pin_net: HashMap<PinRef, NetId>,
    ports: BTreeMap<ComponentId, Vec<PortSpec>>,
}

impl Netlist {
    /// Builds the netlist from per-component port lists and the wires between them.
    ///
    /// Wires whose endpoints are not in `ports` are ignored.
    pub fn build<'a>(
        ports: BTreeMap<ComponentId, Vec<PortSpec>>,
        wires: impl IntoIterator<Item = &'a Wire>,
    ) -> Self {
        let mut pins = Vec::new();
        let mut index = HashMap::new();
        for (&component, specs) in &ports {
            for port in 0..specs.len() as u32 {
                let pin = PinRef::new(component, port);
                index.insert(pin, pins.len());
                pins.push(pin);
            }
        }

        let mut sets = UnionFind::<usize>::new(pins.len());
        for wire in wires {
            if let (Some(&a), Some(&b)) = (index.get(&wire.a), index.get(&wire.b)) {
                sets.union(a, b);
            }
        }

        let mut nets: Arena<NetId, Net> = Arena::new();
        let mut root_net: HashMap<usize, NetId> = HashMap::new();
        let mut pin_net = HashMap::with_capacity(pins.len());
        for (i, pin) in pins.iter().enumerate() {
            let spec = &ports[&pin.component][pin.port as usize];
            let root = sets.find(i);
            let net_id = *root_net.entry(root).or_insert_with(|| {
                nets.alloc(Net {
                    pins: Vec::new(),
                    drivers: Vec::new(),
                    readers: Vec::new(),
                    width: spec.width,
                    width_conflict: false,
                })
            });
            let net = &mut nets[net_id];
            if spec.width != net.width {
                net.width_conflict = true;
                net.width = net.width.min(spec.width);
            }
            net.pins.push(*pin);
            if spec.direction.drives() {
                net.drivers.push(*pin);
            }
            if spec.direction.reads() {
                net.readers.push(*pin);
            }
            pin_net.insert(*pin, net_id);
        }

        Self {
            nets,
            pin_net,
            ports,
        }
    }

    /// Returns the net a pin belongs to.
    pub fn net_of(&self, pin: PinRef) -> Option<NetId> {
        self.pin_net.get(&pin).copied()
    }

    /// Returns a net by ID.
    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(id)
    }

    /// Iterates over all nets in ID order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets.iter()
    }

    /// Number of nets.
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    /// Returns `true` if the circuit has no pins at all.
    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// The port list a component had when the netlist was built.
    pub fn ports(&self, component: ComponentId) -> &[PortSpec] {
        self.ports.get(&component).map_or(&[], Vec::as_slice)
    }

    /// Components covered by this netlist, in ID order.
    pub fn components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.ports.keys().copied()
    }

    /// Nets with conflicting port widths.
    pub fn width_conflicts(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets.iter().filter(|(_, n)| n.width_conflict)
    }
}
