//! Read-only structural view of a circuit for export tooling.
//!
//! Translators (HDL writers, board mappers) consume a [`StructuralView`]:
//! components with their resolved ports, and nets as lists of pins. Nothing
//! here touches simulation state.

use crate::component::ComponentKind;
use crate::design::Design;
use crate::error::StructuralError;
use crate::geom::Location;
use crate::ids::{CircuitId, ComponentId, NetId};
use crate::port::PortSpec;
use crate::wire::PinRef;
use netsim_common::ContentHash;
use serde::Serialize;

/// One component as seen by an exporter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentView {
    /// Component ID within the circuit.
    pub id: ComponentId,
    /// Kind and attributes.
    pub kind: ComponentKind,
    /// User label.
    pub label: Option<String>,
    /// Canvas position.
    pub location: Location,
    /// Resolved port list.
    pub ports: Vec<PortSpec>,
}

/// One net as seen by an exporter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetView {
    /// Net ID within the netlist.
    pub id: NetId,
    /// Declared width.
    pub width: u32,
    /// Every joined pin.
    pub pins: Vec<PinRef>,
    /// Attached ports disagree on width.
    pub width_conflict: bool,
}

/// Components and nets of one circuit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StructuralView {
    /// Circuit ID.
    pub circuit: CircuitId,
    /// Circuit name.
    pub name: String,
    /// Components in ID order.
    pub components: Vec<ComponentView>,
    /// Nets in ID order.
    pub nets: Vec<NetView>,
}

impl StructuralView {
    /// Hash of the serialized view; changes whenever anything an exporter
    /// can see changes.
    pub fn fingerprint(&self) -> Result<ContentHash, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(ContentHash::from_bytes(&bytes))
    }

    /// Serializes the view as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Design {
    /// Builds the structural view of `circuit`.
    pub fn structural_view(&self, circuit: CircuitId) -> Result<StructuralView, StructuralError> {
        let c = self
            .circuit(circuit)
            .ok_or(StructuralError::UnknownCircuit(circuit))?;
        let netlist = self.netlist(circuit)?;
        let components = c
            .components()
            .map(|(id, comp)| ComponentView {
                id,
                kind: comp.kind.clone(),
                label: comp.label.clone(),
                location: comp.location,
                ports: netlist.ports(id).to_vec(),
            })
            .collect();
        let nets = netlist
            .nets()
            .map(|(id, net)| NetView {
                id,
                width: net.width,
                pins: net.pins.clone(),
                width_conflict: net.width_conflict,
            })
            .collect();
        Ok(StructuralView {
            circuit,
            name: c.name().to_string(),
            components,
            nets,
        })
    }
}
