//! Round-based event propagation.
//!
//! The [`Propagator`] owns the time-ordered event queue. Each round it:
//!
//! 1. Pops every entry stamped with the earliest pending time and records
//!    each as a driver contribution (or a forced value) on its net.
//! 2. Resolves each touched net and compares with its cached value.
//! 3. Collects the components reading a changed net, following sub-circuit
//!    boundaries into child states and back out to parents.
//! 4. Evaluates those components in `(state, component)` order and enqueues
//!    every output that differs from the port's recorded contribution, one
//!    round later.
//!
//! Propagation ends when the queue is empty. If it has not emptied after the
//! configured number of rounds, the run stops with the queue intact and the
//! propagator reports [`Phase::Oscillating`].

use crate::evaluator::{evaluate, EvalError, Outputs};
use crate::state::{InstanceData, StateId, StateTree};
use crate::time::SimTime;
use netsim_circuit::{ComponentId, ComponentKind, Design, NetId, PinDirection, PinRef};
use netsim_common::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// What the propagator is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// The queue is empty.
    Idle,
    /// A run is in progress.
    Propagating,
    /// The last run hit the round bound with events still pending.
    Oscillating,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The queue emptied after this many rounds.
    Settled {
        /// Rounds processed.
        rounds: u32,
    },
    /// The round bound was reached with events still pending.
    Oscillated {
        /// Rounds processed.
        rounds: u32,
    },
}

impl RunOutcome {
    /// Rounds processed, however the run ended.
    pub fn rounds(self) -> u32 {
        match self {
            RunOutcome::Settled { rounds } | RunOutcome::Oscillated { rounds } => rounds,
        }
    }

    /// Returns `true` for [`RunOutcome::Settled`].
    pub fn is_settled(self) -> bool {
        matches!(self, RunOutcome::Settled { .. })
    }
}

/// Counters accumulated across runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Rounds processed since the last reset.
    pub total_rounds: u64,
    /// Rounds processed by the most recent run.
    pub last_run_rounds: u32,
    /// Component evaluations since the last reset.
    pub evaluations: u64,
}

/// A component evaluation that failed and drove `Error` instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalFailure {
    /// State the component lives in.
    pub state: StateId,
    /// The failing component.
    pub component: ComponentId,
    /// What went wrong.
    pub error: EvalError,
}

#[derive(Clone, Debug)]
enum Source {
    Driver(PinRef),
    Forced,
}

#[derive(Clone, Debug)]
struct QueueEntry {
    time: SimTime,
    state: StateId,
    net: NetId,
    source: Source,
    value: Value,
}

/// The event queue and round loop.
#[derive(Debug)]
pub struct Propagator {
    queue: VecDeque<QueueEntry>,
    pending: BTreeSet<(StateId, ComponentId)>,
    time: SimTime,
    round_limit: u32,
    phase: Phase,
    stats: PropagationStats,
    failures: Vec<EvalFailure>,
}

impl Propagator {
    /// Creates an idle propagator giving up after `round_limit` rounds per run.
    pub fn new(round_limit: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            pending: BTreeSet::new(),
            time: SimTime::zero(),
            round_limit: round_limit.max(1),
            phase: Phase::Idle,
            stats: PropagationStats::default(),
            failures: Vec::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time of the most recently processed round.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Accumulated counters.
    pub fn stats(&self) -> PropagationStats {
        self.stats
    }

    /// Returns `true` if nothing is queued or scheduled.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.pending.is_empty()
    }

    /// Number of queued net events.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Discards all pending work and counters.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
        self.failures.clear();
        self.time = SimTime::zero();
        self.phase = Phase::Idle;
        self.stats = PropagationStats::default();
    }

    /// Moves to round zero of `tick`. Events left over from an unsettled run
    /// are processed first.
    pub fn advance_tick(&mut self, tick: u64) {
        self.time = SimTime::at_tick(tick);
    }

    /// Marks a component for evaluation in the next round.
    pub fn schedule(&mut self, state: StateId, component: ComponentId) {
        self.pending.insert((state, component));
    }

    /// Overrides a net's value for the next round. Driver contributions are
    /// combined with the forced value; the override lapses as soon as any
    /// driver on the net changes.
    pub fn force(&mut self, state: StateId, net: NetId, value: Value) {
        self.queue.push_back(QueueEntry {
            time: self.time.next_round(),
            state,
            net,
            source: Source::Forced,
            value,
        });
    }

    /// Drains the evaluation failures recorded since the last call.
    pub fn take_failures(&mut self) -> Vec<EvalFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Rewrites state IDs after the tree was rebuilt. Work for states absent
    /// from `map` is dropped.
    pub(crate) fn remap(&mut self, map: &HashMap<StateId, StateId>) {
        self.queue.retain_mut(|entry| match map.get(&entry.state) {
            Some(&new) => {
                entry.state = new;
                true
            }
            None => false,
        });
        self.pending = std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|(state, component)| map.get(&state).map(|&s| (s, component)))
            .collect();
    }

    /// Processes rounds until the queue empties or the round bound is hit.
    pub fn run(&mut self, tree: &mut StateTree, design: &Design) -> RunOutcome {
        let mut rounds = 0;
        loop {
            if self.is_idle() {
                self.phase = Phase::Idle;
                self.stats.last_run_rounds = rounds;
                log::trace!("settled after {rounds} rounds at {}", self.time);
                return RunOutcome::Settled { rounds };
            }
            if rounds >= self.round_limit {
                self.phase = Phase::Oscillating;
                self.stats.last_run_rounds = rounds;
                log::warn!(
                    "no stable state after {rounds} rounds at {}, {} events pending",
                    self.time,
                    self.queue.len()
                );
                return RunOutcome::Oscillated { rounds };
            }
            self.phase = Phase::Propagating;
            self.step(tree, design);
            rounds += 1;
            self.stats.total_rounds += 1;
        }
    }

    fn step(&mut self, tree: &mut StateTree, design: &Design) {
        let now = self
            .queue
            .front()
            .map_or(self.time.next_round(), |e| e.time.max(self.time.next_round()));
        self.time = now;

        // Record contributions.
        let mut touched: BTreeMap<(StateId, NetId), Option<Value>> = BTreeMap::new();
        while self.queue.front().is_some_and(|e| e.time <= now) {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            let Some(net) = tree
                .get_mut(entry.state)
                .and_then(|s| s.net_mut(entry.net))
            else {
                continue;
            };
            let forced = touched.entry((entry.state, entry.net)).or_default();
            match entry.source {
                Source::Driver(pin) => net.drive(pin, &entry.value),
                Source::Forced => {
                    let width = net.width();
                    let value = if entry.value.width() == width {
                        entry.value
                    } else {
                        Value::error(width)
                    };
                    *forced = Some(match forced.take() {
                        Some(prev) => prev.combine(&value).unwrap_or_else(|_| Value::error(width)),
                        None => value,
                    });
                }
            }
        }

        // Resolve touched nets.
        let mut changed = Vec::new();
        for ((state_id, net_id), forced) in touched {
            let Some(net) = tree.get_mut(state_id).and_then(|s| s.net_mut(net_id)) else {
                continue;
            };
            let width = net.width();
            let resolved = net.resolve();
            let value = match forced {
                Some(f) => f.combine(&resolved).unwrap_or_else(|_| Value::error(width)),
                None => resolved,
            };
            if net.update(value) {
                changed.push((state_id, net_id));
            }
        }

        // Find readers.
        let mut affected = std::mem::take(&mut self.pending);
        for (state_id, net_id) in changed {
            readers_of(tree, design, state_id, net_id, &mut affected);
        }

        // Evaluate.
        let next = now.next_round();
        for (state_id, component) in affected {
            self.evaluate(tree, design, state_id, component, next);
        }
    }

    fn evaluate(
        &mut self,
        tree: &mut StateTree,
        design: &Design,
        state_id: StateId,
        component: ComponentId,
        next: SimTime,
    ) {
        let Some(state) = tree.get(state_id) else {
            return;
        };
        let Some(kind) = design
            .circuit(state.circuit())
            .and_then(|c| c.component(component))
            .map(|c| &c.kind)
        else {
            return;
        };
        let ports = state.netlist().ports(component).to_vec();
        self.stats.evaluations += 1;

        let result: Result<Outputs, EvalError> = match kind {
            ComponentKind::Subcircuit { circuit } => {
                let child = state.child(component).and_then(|c| tree.get(c));
                Ok(design
                    .interface_pins(*circuit)
                    .into_iter()
                    .zip(&ports)
                    .enumerate()
                    .filter(|(_, (_, port))| port.direction.drives())
                    .map(|(i, (pin, port))| {
                        let value = child
                            .and_then(|c| c.pin_value(PinRef::new(pin, 0)))
                            .unwrap_or_else(|| Value::unknown(port.width));
                        (i as u32, value)
                    })
                    .collect())
            }
            ComponentKind::Pin {
                width,
                direction: PinDirection::Input,
            } if state.parent().is_some() => {
                let value = import_from_parent(tree, design, state_id, component)
                    .unwrap_or_else(|| Value::unknown(*width))
                    .resize_to(*width);
                if let Some(data) = tree.get_mut(state_id).and_then(|s| s.data_mut(component)) {
                    *data = InstanceData::Pin {
                        value: value.clone(),
                    };
                }
                Ok(vec![(0, value)])
            }
            kind => {
                let inputs: Vec<Value> = ports
                    .iter()
                    .enumerate()
                    .map(|(i, port)| {
                        state
                            .pin_value(PinRef::new(component, i as u32))
                            .unwrap_or_else(|| Value::unknown(port.width))
                    })
                    .collect();
                let data = tree.get_mut(state_id).and_then(|s| s.data_mut(component));
                evaluate(kind, &inputs, data)
            }
        };

        let outputs = match result {
            Ok(outputs) => outputs,
            Err(error) => {
                log::warn!("evaluation of {component} failed: {error}");
                self.failures.push(EvalFailure {
                    state: state_id,
                    component,
                    error,
                });
                ports
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.direction.drives())
                    .map(|(i, p)| (i as u32, Value::error(p.width)))
                    .collect()
            }
        };

        let Some(state) = tree.get(state_id) else {
            return;
        };
        for (port, value) in outputs {
            let pin = PinRef::new(component, port);
            let Some(net_id) = state.netlist().net_of(pin) else {
                continue;
            };
            let Some(net) = state.net(net_id) else {
                continue;
            };
            let value = value.resize_to(net.width());
            if net.contribution(pin) == Some(&value) {
                continue;
            }
            self.queue.push_back(QueueEntry {
                time: next,
                state: state_id,
                net: net_id,
                source: Source::Driver(pin),
                value,
            });
        }
    }
}

/// Adds every component that must re-evaluate because `net` changed.
fn readers_of(
    tree: &StateTree,
    design: &Design,
    state_id: StateId,
    net_id: NetId,
    affected: &mut BTreeSet<(StateId, ComponentId)>,
) {
    let Some(state) = tree.get(state_id) else {
        return;
    };
    let Some(net) = state.netlist().net(net_id) else {
        return;
    };
    let Some(circuit) = design.circuit(state.circuit()) else {
        return;
    };
    for pin in &net.readers {
        let Some(component) = circuit.component(pin.component) else {
            continue;
        };
        match &component.kind {
            // Into the child: its input pin imports the new value.
            ComponentKind::Subcircuit { circuit: child_circuit } => {
                let Some(child) = state.child(pin.component) else {
                    continue;
                };
                if let Some(&inner) = design.interface_pins(*child_circuit).get(pin.port as usize) {
                    affected.insert((child, inner));
                }
            }
            // Out of the child: the owning instance re-exports its outputs.
            ComponentKind::Pin {
                direction: PinDirection::Output,
                ..
            } => {
                affected.insert((state_id, pin.component));
                if let Some((parent, instance)) = state.parent() {
                    affected.insert((parent, instance));
                }
            }
            _ => {
                affected.insert((state_id, pin.component));
            }
        }
    }
}

/// The value the parent drives into the instance port backed by input pin
/// `component` of state `state_id`.
fn import_from_parent(
    tree: &StateTree,
    design: &Design,
    state_id: StateId,
    component: ComponentId,
) -> Option<Value> {
    let state = tree.get(state_id)?;
    let (parent_id, instance) = state.parent()?;
    let port = design
        .interface_pins(state.circuit())
        .iter()
        .position(|&c| c == component)?;
    tree.get(parent_id)?
        .pin_value(PinRef::new(instance, port as u32))
}
