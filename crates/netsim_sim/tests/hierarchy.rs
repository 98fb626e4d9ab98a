//! Sub-circuit instances, structural edits on a live simulation, and the
//! background thread.

mod common;

use common::*;
use netsim_circuit::{
    CircuitId, ComponentId, ComponentKind, Design, Edit, Location, StructuralError, Transaction,
};
use netsim_config::SimulatorConfig;
use netsim_sim::{InstanceData, SimError, SimulationThread, Simulator};

struct Inverted {
    design: Design,
    main: CircuitId,
    inv: CircuitId,
    x: ComponentId,
    u: ComponentId,
    z: ComponentId,
}

/// `main`: input `x` into an `inv` instance, its output to pin `z`.
/// `inv`: input, NOT gate, output.
fn inverted() -> Inverted {
    let mut d = Design::new();
    let main = d.add_circuit("main").unwrap();
    let inv = d.add_circuit("inv").unwrap();

    let a = d.add_component(inv, input(1), Location::new(0, 0)).unwrap();
    let n = d
        .add_component(inv, ComponentKind::Not { width: 1 }, Location::new(20, 0))
        .unwrap();
    let y = d.add_component(inv, output(1), Location::new(40, 0)).unwrap();
    d.add_wire(inv, pin(a, 0), pin(n, 1)).unwrap();
    d.add_wire(inv, pin(n, 0), pin(y, 0)).unwrap();

    let x = d.add_component(main, input(1), Location::new(0, 0)).unwrap();
    let u = d
        .add_component(main, ComponentKind::Subcircuit { circuit: inv }, Location::new(20, 0))
        .unwrap();
    let z = d.add_component(main, output(1), Location::new(60, 0)).unwrap();
    d.add_wire(main, pin(x, 0), pin(u, 0)).unwrap();
    d.add_wire(main, pin(u, 1), pin(z, 0)).unwrap();

    Inverted {
        design: d,
        main,
        inv,
        x,
        u,
        z,
    }
}

#[test]
fn values_cross_instance_boundaries() {
    let t = inverted();
    let mut sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    let root = sim.root();
    sim.settle().unwrap();
    assert_eq!(read(&sim, t.z, 0), v("1"));

    sim.poke(root, t.x, v("1")).unwrap();
    sim.settle().unwrap();
    assert_eq!(read(&sim, t.z, 0), v("0"));

    let child = sim.state_tree().find_path("main:inv#1").unwrap();
    assert_eq!(sim.state_tree().parent_state(child), Some(root));
    let state = sim.state(child).unwrap();
    assert_eq!(state.circuit(), t.inv);
    // the child's input pin holds what the parent drove in
    assert_eq!(
        state.data(ComponentId::from_raw(0)),
        Some(&InstanceData::Pin { value: v("1") })
    );
}

#[test]
fn nested_instances_chain() {
    let t = inverted();
    let mut d = t.design;
    // twice: main -> dbl -> inv, inv
    let dbl = d.add_circuit("dbl").unwrap();
    let a = d.add_component(dbl, input(1), Location::new(0, 0)).unwrap();
    let u1 = d
        .add_labeled_component(
            dbl,
            ComponentKind::Subcircuit { circuit: t.inv },
            Location::new(20, 0),
            Some("first"),
        )
        .unwrap();
    let u2 = d
        .add_labeled_component(
            dbl,
            ComponentKind::Subcircuit { circuit: t.inv },
            Location::new(60, 0),
            Some("second"),
        )
        .unwrap();
    let y = d.add_component(dbl, output(1), Location::new(100, 0)).unwrap();
    d.add_wire(dbl, pin(a, 0), pin(u1, 0)).unwrap();
    d.add_wire(dbl, pin(u1, 1), pin(u2, 0)).unwrap();
    d.add_wire(dbl, pin(u2, 1), pin(y, 0)).unwrap();

    let main = t.main;
    let top = d.add_component(main, input(1), Location::new(0, 80)).unwrap();
    let inst = d
        .add_labeled_component(
            main,
            ComponentKind::Subcircuit { circuit: dbl },
            Location::new(20, 80),
            Some("d"),
        )
        .unwrap();
    let out = d.add_component(main, output(1), Location::new(80, 80)).unwrap();
    d.add_wire(main, pin(top, 0), pin(inst, 0)).unwrap();
    d.add_wire(main, pin(inst, 1), pin(out, 0)).unwrap();

    let mut sim = Simulator::new(d, SimulatorConfig::default()).unwrap();
    let root = sim.root();
    // main, main:inv#1, main:d, main:d:first, main:d:second
    assert_eq!(sim.state_tree().len(), 5);
    assert!(sim.state_tree().find_path("main:d:second").is_some());

    sim.settle().unwrap();
    assert_eq!(read(&sim, out, 0), v("0"));
    sim.poke(root, top, v("1")).unwrap();
    sim.settle().unwrap();
    assert_eq!(read(&sim, out, 0), v("1"));
}

#[test]
fn pins_inside_instances_are_not_pokeable() {
    let t = inverted();
    let mut sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    let child = sim.state_tree().find_path("main:inv#1").unwrap();
    let err = sim
        .poke(child, ComponentId::from_raw(0), v("1"))
        .unwrap_err();
    assert!(matches!(err, SimError::NotPokeable { .. }));
}

#[test]
fn cyclic_instantiation_is_rejected() {
    let t = inverted();
    let mut sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    let before = sim.design().circuit(t.inv).unwrap().component_count();

    let tx = Transaction::new().with(Edit::AddComponent {
        kind: ComponentKind::Subcircuit { circuit: t.main },
        location: Location::new(0, 100),
        label: None,
    });
    let err = sim.edit(t.inv, &tx).unwrap_err();
    assert!(matches!(
        err,
        SimError::Structural(StructuralError::CyclicContainment { .. })
    ));
    assert_eq!(sim.design().circuit(t.inv).unwrap().component_count(), before);
    assert!(sim.diagnostics().has_errors());

    let self_ref = Transaction::new().with(Edit::AddComponent {
        kind: ComponentKind::Subcircuit { circuit: t.main },
        location: Location::new(0, 100),
        label: None,
    });
    assert!(sim.edit(t.main, &self_ref).is_err());
    // the simulation is untouched and still runs
    assert!(sim.settle().is_ok());
}

#[test]
fn edit_keeps_register_contents_and_untouched_states() {
    let mut d = Design::new();
    let main = d.add_circuit("main").unwrap();
    let data = d.add_component(main, input(2), Location::new(0, 0)).unwrap();
    let clk = d
        .add_component(
            main,
            ComponentKind::Clock {
                high_ticks: 1,
                low_ticks: 1,
            },
            Location::new(0, 20),
        )
        .unwrap();
    let reg = d
        .add_component(main, ComponentKind::Register { width: 2 }, Location::new(20, 0))
        .unwrap();
    let q = d.add_component(main, output(2), Location::new(60, 0)).unwrap();
    d.add_wire(main, pin(data, 0), pin(reg, 1)).unwrap();
    d.add_wire(main, pin(clk, 0), pin(reg, 2)).unwrap();
    d.add_wire(main, pin(reg, 0), pin(q, 0)).unwrap();

    let mut sim = Simulator::new(d, SimulatorConfig::default()).unwrap();
    let root = sim.root();
    sim.settle().unwrap();
    sim.poke(root, data, v("11")).unwrap();
    sim.settle().unwrap();
    sim.tick();
    assert_eq!(read(&sim, q, 0), v("11"));

    let tx = Transaction::new().with(Edit::AddComponent {
        kind: ComponentKind::Probe { width: 2 },
        location: Location::new(80, 0),
        label: Some("watch".into()),
    });
    let result = sim.edit(main, &tx).unwrap();
    let probe = result.added_components().next().unwrap();
    assert_eq!(result.invalidated, vec![main]);

    // rebuilt nets start unknown; stored contents come back on the next run
    assert!(read(&sim, q, 0).is_all_unknown());
    sim.settle().unwrap();
    assert_eq!(read(&sim, q, 0), v("11"));
    assert_eq!(read(&sim, data, 0), v("11"), "poked value survives the edit");
    assert!(read(&sim, probe, 0).is_all_unknown());
}

#[test]
fn editing_a_child_rebuilds_every_instance() {
    let t = inverted();
    let mut sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    let root = sim.root();
    sim.poke(root, t.x, v("1")).unwrap();
    sim.settle().unwrap();

    // swap the inverter for a buffer
    let tx = Transaction::new().with(Edit::SetAttributes {
        component: ComponentId::from_raw(1),
        kind: ComponentKind::Buffer { width: 1 },
    });
    let result = sim.edit(t.inv, &tx).unwrap();
    assert!(result.invalidated.contains(&t.main));
    assert!(result.invalidated.contains(&t.inv));
    sim.settle().unwrap();
    assert_eq!(read(&sim, t.z, 0), v("1"));
}

#[test]
fn move_leaves_values_in_place() {
    let t = inverted();
    let mut sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    sim.settle().unwrap();
    let tx = Transaction::new().with(Edit::MoveComponent {
        component: t.z,
        location: Location::new(200, 200),
    });
    let result = sim.edit(t.main, &tx).unwrap();
    assert!(result.invalidated.is_empty());
    assert_eq!(read(&sim, t.z, 0), v("1"));
}

#[test]
fn rename_and_relabel_refresh_paths_in_place() {
    let t = inverted();
    let mut sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    let root = sim.root();
    sim.poke(root, t.x, v("1")).unwrap();
    sim.settle().unwrap();

    let renamed = sim
        .edit(t.inv, &Transaction::new().with(Edit::Rename { name: "neg".into() }))
        .unwrap();
    assert!(renamed.invalidated.is_empty());
    let tree = sim.state_tree();
    assert!(tree.find_path("main:inv#1").is_none());
    let child = tree.find_path("main:neg#1").unwrap();
    assert_eq!(sim.state(child).unwrap().path(), "main:neg#1");

    let relabel = Transaction::new().with(Edit::SetLabel {
        component: t.u,
        label: Some("core".into()),
    });
    sim.edit(t.main, &relabel).unwrap();
    sim.edit(t.main, &Transaction::new().with(Edit::Rename { name: "top".into() }))
        .unwrap();
    assert_eq!(sim.state(root).unwrap().path(), "top");
    assert_eq!(sim.state_tree().find_path("top:core"), Some(child));
    assert!(sim.snapshot().find("top:core").is_some());
    assert_eq!(read(&sim, t.z, 0), v("0"));
}

#[test]
fn background_thread_runs_the_same_circuit() {
    let t = inverted();
    let sim = Simulator::new(t.design, SimulatorConfig::default()).unwrap();
    let root = sim.root();
    let mut thread = SimulationThread::spawn(sim).unwrap();
    thread.poke(root, t.x, v("1")).unwrap();
    thread.sync().unwrap();

    let snap = thread.snapshot();
    assert!(snap.find("main:inv#1").is_some());
    let sim = thread.shutdown().unwrap();
    assert_eq!(read(&sim, t.z, 0), v("0"));
}
