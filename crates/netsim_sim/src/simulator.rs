//! The simulator: a design, its state tree, and the propagator driving it.
//!
//! [`Simulator`] is single-threaded and synchronous; every call either
//! queues work or runs propagation to completion before returning. Wrap it in
//! a [`SimulationThread`](crate::SimulationThread) to run it in the
//! background.

use crate::error::SimError;
use crate::propagator::{Phase, PropagationStats, Propagator, RunOutcome};
use crate::snapshot::{Snapshot, SnapshotCell};
use crate::state::{clock_level, CircuitState, InstanceData, StateId, StateTree};
use crossbeam_channel::{Receiver, Sender};
use netsim_circuit::{
    CircuitId, ComponentId, ComponentKind, Design, NetId, PinDirection, PinRef, Transaction,
    TransactionResult,
};
use netsim_common::{Frequency, Value};
use netsim_config::SimulatorConfig;
use netsim_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Locus};
use std::collections::HashSet;
use std::sync::Arc;

/// Notifications delivered to [`Simulator::subscribe`] receivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulatorEvent {
    /// A run finished, settled or not.
    PropagationCompleted {
        /// Ticks since the last reset.
        tick: u64,
        /// The run followed a clock tick.
        ticked: bool,
        /// The run hit the round bound.
        oscillating: bool,
    },
    /// The design, auto-tick setting or tick frequency changed.
    StateChanged,
    /// All state was discarded.
    Reset,
}

/// An event-driven simulation of one design.
#[derive(Debug)]
pub struct Simulator {
    design: Design,
    config: SimulatorConfig,
    tree: StateTree,
    propagator: Propagator,
    tick: u64,
    oscillating: bool,
    exception: bool,
    auto_tick: bool,
    tick_frequency: Frequency,
    listeners: Vec<Sender<SimulatorEvent>>,
    snapshots: Arc<SnapshotCell>,
    diagnostics: DiagnosticSink,
}

impl Simulator {
    /// Instantiates the design's top circuit with every net `Unknown` and
    /// every component scheduled. Nothing propagates until the first
    /// [`nudge`](Self::nudge) or [`tick`](Self::tick).
    pub fn new(design: Design, config: SimulatorConfig) -> Result<Self, SimError> {
        let tree = StateTree::build(&design, config.simulation.pin_default, 0)?;
        let mut sim = Self {
            propagator: Propagator::new(config.simulation.oscillation_rounds),
            auto_tick: config.clock.auto_tick,
            tick_frequency: config.clock.frequency,
            design,
            config,
            tree,
            tick: 0,
            oscillating: false,
            exception: false,
            listeners: Vec::new(),
            snapshots: Arc::new(SnapshotCell::default()),
            diagnostics: DiagnosticSink::new(),
        };
        sim.schedule_all();
        sim.publish();
        log::info!(
            "simulator ready: {} circuit states, round bound {}",
            sim.tree.len(),
            sim.config.simulation.oscillation_rounds
        );
        Ok(sim)
    }

    // -- queries ----------------------------------------------------------

    /// The simulated design.
    pub fn design(&self) -> &Design {
        &self.design
    }

    /// The configuration the simulator was built with.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// All circuit states.
    pub fn state_tree(&self) -> &StateTree {
        &self.tree
    }

    /// The top-level state.
    pub fn root(&self) -> StateId {
        self.tree.root()
    }

    /// Looks up a circuit state.
    pub fn state(&self, id: StateId) -> Option<&CircuitState> {
        self.tree.get(id)
    }

    /// Resolved value of a net.
    pub fn get(&self, state: StateId, net: NetId) -> Option<&Value> {
        self.tree.get(state)?.get(net)
    }

    /// The value `port` of `component` reads, adapted to the port width.
    pub fn pin_value(&self, state: StateId, component: ComponentId, port: u32) -> Option<Value> {
        self.tree.get(state)?.pin_value(PinRef::new(component, port))
    }

    /// Ticks since the last reset.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The last run hit the round bound. Cleared by the next settled run or
    /// a reset.
    pub fn is_oscillating(&self) -> bool {
        self.oscillating
    }

    /// A component evaluation has failed since the last reset.
    pub fn is_exception_encountered(&self) -> bool {
        self.exception
    }

    /// What the propagator is doing.
    pub fn phase(&self) -> Phase {
        self.propagator.phase()
    }

    /// Propagation counters since the last reset.
    pub fn stats(&self) -> PropagationStats {
        self.propagator.stats()
    }

    /// Oscillation, failed evaluations and rejected edits reported so far.
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.load()
    }

    /// The cell snapshots are published into, for readers on other threads.
    pub fn snapshot_cell(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.snapshots)
    }

    /// Whether ticks should be issued automatically.
    pub fn is_auto_ticking(&self) -> bool {
        self.auto_tick
    }

    /// Rate of automatic ticks.
    pub fn tick_frequency(&self) -> Frequency {
        self.tick_frequency
    }

    // -- listeners --------------------------------------------------------

    /// Registers a listener. Receivers that are dropped are forgotten on the
    /// next event.
    pub fn subscribe(&mut self) -> Receiver<SimulatorEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.listeners.push(tx);
        rx
    }

    fn notify(&mut self, event: SimulatorEvent) {
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // -- driving ----------------------------------------------------------

    /// Runs propagation until the queue empties or the round bound is hit.
    /// Returns immediately with zero rounds if nothing is pending.
    pub fn nudge(&mut self) -> RunOutcome {
        let outcome = self.propagator.run(&mut self.tree, &self.design);
        self.finish_run(outcome, false);
        outcome
    }

    /// Like [`nudge`](Self::nudge) but reports oscillation as an error.
    pub fn settle(&mut self) -> Result<u32, SimError> {
        match self.nudge() {
            RunOutcome::Settled { rounds } => Ok(rounds),
            RunOutcome::Oscillated { rounds } => Err(SimError::OscillationDetected {
                tick: self.tick,
                rounds,
            }),
        }
    }

    /// Advances every clock by one tick and propagates.
    pub fn tick(&mut self) -> RunOutcome {
        self.tick += 1;
        self.propagator.advance_tick(self.tick);
        let mut toggled = Vec::new();
        for (state_id, state) in self.tree.states() {
            let Some(circuit) = self.design.circuit(state.circuit()) else {
                continue;
            };
            for (id, component) in circuit.components() {
                if let ComponentKind::Clock {
                    high_ticks,
                    low_ticks,
                } = component.kind
                {
                    let level = clock_level(self.tick, high_ticks, low_ticks);
                    if state.data(id) != Some(&InstanceData::Clock { level }) {
                        toggled.push((state_id, id, level));
                    }
                }
            }
        }
        for (state_id, id, level) in toggled {
            if let Some(data) = self.tree.get_mut(state_id).and_then(|s| s.data_mut(id)) {
                *data = InstanceData::Clock { level };
                self.propagator.schedule(state_id, id);
            }
        }
        let outcome = self.propagator.run(&mut self.tree, &self.design);
        self.finish_run(outcome, true);
        outcome
    }

    /// Issues `count` ticks; returns the outcome of the last.
    pub fn tick_many(&mut self, count: u64) -> RunOutcome {
        let mut outcome = RunOutcome::Settled { rounds: 0 };
        for _ in 0..count {
            outcome = self.tick();
        }
        outcome
    }

    /// Sets the value a top-level input pin drives. Takes effect on the next
    /// run.
    pub fn poke(&mut self, state: StateId, component: ComponentId, value: Value) -> Result<(), SimError> {
        let reject = |reason: &str| SimError::NotPokeable {
            state: state.as_raw(),
            component,
            reason: reason.to_string(),
        };
        let circuit_state = self
            .tree
            .get(state)
            .ok_or(SimError::UnknownState(state.as_raw()))?;
        if circuit_state.parent().is_some() {
            return Err(reject("pins inside sub-circuits follow their parent"));
        }
        let kind = self
            .design
            .circuit(circuit_state.circuit())
            .and_then(|c| c.component(component))
            .map(|c| &c.kind);
        let width = match kind {
            Some(ComponentKind::Pin {
                width,
                direction: PinDirection::Input,
            }) => *width,
            Some(_) => return Err(reject("not an input pin")),
            None => return Err(reject("no such component")),
        };
        if let Some(data) = self.tree.get_mut(state).and_then(|s| s.data_mut(component)) {
            *data = InstanceData::Pin {
                value: value.resize_to(width),
            };
        }
        self.propagator.schedule(state, component);
        log::debug!("poked {component} with {value}");
        Ok(())
    }

    /// Overrides a net's value for the next run. Drivers on the net combine
    /// with it; it lapses once any of them changes. A value whose width
    /// differs from the net's forces `Error`.
    pub fn set(&mut self, state: StateId, net: NetId, value: Value) -> Result<(), SimError> {
        let circuit_state = self
            .tree
            .get(state)
            .ok_or(SimError::UnknownState(state.as_raw()))?;
        if circuit_state.net(net).is_none() {
            return Err(SimError::UnknownNet {
                state: state.as_raw(),
                net,
            });
        }
        self.propagator.force(state, net, value);
        Ok(())
    }

    /// Discards all simulation state: a fresh all-`Unknown` tree at tick 0,
    /// an empty queue and cleared flags.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.tree = StateTree::build(&self.design, self.config.simulation.pin_default, 0)?;
        self.propagator.clear();
        self.tick = 0;
        self.oscillating = false;
        self.exception = false;
        self.schedule_all();
        self.publish();
        log::info!("simulation reset");
        self.notify(SimulatorEvent::Reset);
        Ok(())
    }

    /// Applies a transaction to the design and rebuilds the states of every
    /// invalidated circuit. Values in untouched states and stored component
    /// contents survive. Renames and relabels only refresh state paths.
    pub fn edit(&mut self, circuit: CircuitId, transaction: &Transaction) -> Result<TransactionResult, SimError> {
        let result = match self.design.apply(circuit, transaction) {
            Ok(result) => result,
            Err(err) => {
                let name = self
                    .design
                    .circuit(circuit)
                    .map_or_else(|| format!("circuit{}", circuit.as_raw()), |c| c.name().to_string());
                log::warn!("edit of '{name}' rejected: {err}");
                self.diagnostics.emit(err.to_diagnostic(&name));
                return Err(err.into());
            }
        };
        if !result.invalidated.is_empty() {
            let invalidated: HashSet<CircuitId> = result.invalidated.iter().copied().collect();
            let (tree, rebuild) = self.tree.rebuild(
                &self.design,
                &invalidated,
                self.config.simulation.pin_default,
                self.tick,
            )?;
            self.tree = tree;
            self.propagator.remap(&rebuild.carried);
            for state_id in &rebuild.fresh {
                self.schedule_state(*state_id);
            }
            for id in &result.invalidated {
                self.design.check(*id, &self.diagnostics)?;
            }
            log::debug!(
                "rebuilt {} circuit states, kept {}",
                rebuild.fresh.len(),
                rebuild.carried.len()
            );
        } else {
            self.tree.refresh_paths(&self.design);
        }
        self.publish();
        self.notify(SimulatorEvent::StateChanged);
        Ok(result)
    }

    /// Turns automatic ticking on or off.
    pub fn set_auto_tick(&mut self, enabled: bool) {
        if self.auto_tick != enabled {
            self.auto_tick = enabled;
            self.notify(SimulatorEvent::StateChanged);
        }
    }

    /// Changes the automatic tick rate.
    pub fn set_tick_frequency(&mut self, frequency: Frequency) {
        if self.tick_frequency != frequency {
            self.tick_frequency = frequency;
            self.notify(SimulatorEvent::StateChanged);
        }
    }

    // -- internals --------------------------------------------------------

    fn schedule_all(&mut self) {
        let ids: Vec<StateId> = self.tree.states().map(|(id, _)| id).collect();
        for id in ids {
            self.schedule_state(id);
        }
    }

    fn schedule_state(&mut self, id: StateId) {
        let Some(state) = self.tree.get(id) else {
            return;
        };
        for component in state.netlist().components() {
            self.propagator.schedule(id, component);
        }
    }

    fn finish_run(&mut self, outcome: RunOutcome, ticked: bool) {
        let top = self
            .design
            .top()
            .and_then(|t| self.design.circuit(t))
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        match outcome {
            RunOutcome::Settled { .. } => self.oscillating = false,
            RunOutcome::Oscillated { rounds } => {
                if !self.oscillating {
                    self.diagnostics.emit(
                        Diagnostic::warning(
                            DiagnosticCode::OSCILLATION,
                            format!("circuit did not stabilize within {rounds} propagation rounds"),
                            Locus::Circuit {
                                circuit: top.clone(),
                            },
                        )
                        .with_note(format!("at tick {}", self.tick))
                        .with_help("look for a feedback loop without a register, or reset"),
                    );
                }
                self.oscillating = true;
            }
        }

        for failure in self.propagator.take_failures() {
            self.exception = true;
            let (path, circuit) = self
                .tree
                .get(failure.state)
                .and_then(|s| {
                    let name = self.design.circuit(s.circuit())?.name().to_string();
                    Some((s.path().to_string(), name))
                })
                .unwrap_or_else(|| (top.clone(), top.clone()));
            self.diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticCode::EVALUATION_FAILED,
                    format!("evaluation of {} failed: {}", failure.component, failure.error),
                    Locus::Component {
                        circuit,
                        component: failure.component.as_raw(),
                    },
                )
                .with_note(format!("in {path}; its outputs now drive E")),
            );
        }

        self.publish();
        self.notify(SimulatorEvent::PropagationCompleted {
            tick: self.tick,
            ticked,
            oscillating: self.oscillating,
        });
    }

    fn publish(&self) {
        self.snapshots.store(Snapshot::capture(
            &self.tree,
            self.tick,
            self.oscillating,
            self.exception,
        ));
    }
}
