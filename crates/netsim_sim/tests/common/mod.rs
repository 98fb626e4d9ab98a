//! Shared helpers for simulator integration tests.

#![allow(dead_code)]

use netsim_circuit::{ComponentId, ComponentKind, NetId, PinDirection, PinRef};
use netsim_common::Value;
use netsim_sim::{Simulator, StateId};

pub fn v(s: &str) -> Value {
    s.parse().unwrap()
}

pub fn input(width: u32) -> ComponentKind {
    ComponentKind::Pin {
        width,
        direction: PinDirection::Input,
    }
}

pub fn output(width: u32) -> ComponentKind {
    ComponentKind::Pin {
        width,
        direction: PinDirection::Output,
    }
}

pub fn constant(bits: &str) -> ComponentKind {
    ComponentKind::Constant { value: v(bits) }
}

pub fn pin(component: ComponentId, port: u32) -> PinRef {
    PinRef::new(component, port)
}

/// The net `port` of `component` sits on, in `state`.
pub fn net_of(sim: &Simulator, state: StateId, component: ComponentId, port: u32) -> NetId {
    sim.state(state)
        .unwrap()
        .netlist()
        .net_of(PinRef::new(component, port))
        .unwrap()
}

/// What `port` of `component` reads in the root state.
pub fn read(sim: &Simulator, component: ComponentId, port: u32) -> Value {
    sim.pin_value(sim.root(), component, port).unwrap()
}

/// Resolved value of the net under `port` of `component` in the root state.
pub fn net_value(sim: &Simulator, component: ComponentId, port: u32) -> Value {
    let root = sim.root();
    sim.get(root, net_of(sim, root, component, port)).unwrap().clone()
}
