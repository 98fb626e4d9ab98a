//! Background simulation thread and its command channel.
//!
//! The thread owns the [`Simulator`] exclusively. Callers talk to it through
//! a bounded crossbeam channel; requests that produce a result carry a
//! one-slot reply channel. Commands are handled strictly between propagation
//! runs, so an edit never observes a half-propagated state. After each batch
//! of commands that changed inputs or structure, the thread propagates once.
//!
//! ```text
//!   caller threads                      simulation thread
//!   --------------                      -----------------
//!   SimulationThread ── cmd_tx ──────▶ drain commands
//!        ▲           bounded(queue)     nudge / tick
//!        └─── SnapshotCell ◀────────── publish snapshot
//! ```

use crate::error::SimError;
use crate::simulator::{Simulator, SimulatorEvent};
use crate::snapshot::{Snapshot, SnapshotCell};
use crate::state::StateId;
use crate::tick_counter::TickCounter;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use netsim_circuit::{CircuitId, ComponentId, NetId, Transaction, TransactionResult};
use netsim_common::{Frequency, Value};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

type Reply<T> = Sender<Result<T, SimError>>;

enum Command {
    Tick {
        count: u64,
    },
    Nudge,
    Reset {
        reply: Reply<()>,
    },
    Poke {
        state: StateId,
        component: ComponentId,
        value: Value,
        reply: Reply<()>,
    },
    Set {
        state: StateId,
        net: NetId,
        value: Value,
        reply: Reply<()>,
    },
    Edit {
        circuit: CircuitId,
        transaction: Transaction,
        reply: Reply<TransactionResult>,
    },
    SetAutoTick(bool),
    SetTickFrequency(Frequency),
    Sync {
        reply: Reply<()>,
    },
    Shutdown,
}

/// Handle to a simulator running on its own thread.
///
/// Dropping the handle shuts the thread down and joins it.
pub struct SimulationThread {
    cmd_tx: Option<Sender<Command>>,
    handle: Option<JoinHandle<Simulator>>,
    snapshots: Arc<SnapshotCell>,
    events: Receiver<SimulatorEvent>,
    tick_rate: Arc<Mutex<Option<f64>>>,
}

impl SimulationThread {
    /// Moves `simulator` onto a new thread. The command queue is bounded by
    /// the simulator's configured queue capacity.
    pub fn spawn(mut simulator: Simulator) -> Result<Self, SimError> {
        let capacity = simulator.config().simulation.queue_capacity.max(1);
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(capacity);
        let snapshots = simulator.snapshot_cell();
        let events = simulator.subscribe();
        let tick_rate = Arc::new(Mutex::new(None));
        let worker = Worker {
            next_tick: Instant::now() + simulator.tick_frequency().period(),
            sim: simulator,
            cmd_rx,
            counter: TickCounter::new(),
            tick_rate: Arc::clone(&tick_rate),
        };
        let handle = thread::Builder::new()
            .name("netsim-sim".into())
            .spawn(move || worker.run())
            .map_err(|e| SimError::Spawn(e.to_string()))?;
        Ok(Self {
            cmd_tx: Some(cmd_tx),
            handle: Some(handle),
            snapshots,
            events,
            tick_rate,
        })
    }

    fn send(&self, command: Command) -> Result<(), SimError> {
        let cmd_tx = self.cmd_tx.as_ref().ok_or(SimError::Shutdown)?;
        cmd_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => SimError::ChannelFull,
            TrySendError::Disconnected(_) => SimError::Shutdown,
        })
    }

    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, SimError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(make(reply_tx))?;
        reply_rx.recv().map_err(|_| SimError::Shutdown)?
    }

    /// Queues one clock tick.
    pub fn tick(&self) -> Result<(), SimError> {
        self.send(Command::Tick { count: 1 })
    }

    /// Queues `count` clock ticks.
    pub fn tick_many(&self, count: u64) -> Result<(), SimError> {
        self.send(Command::Tick { count })
    }

    /// Queues a propagation run.
    pub fn nudge(&self) -> Result<(), SimError> {
        self.send(Command::Nudge)
    }

    /// Resets the simulator and waits for it to finish.
    pub fn reset(&self) -> Result<(), SimError> {
        self.request(|reply| Command::Reset { reply })
    }

    /// Sets a top-level input pin; propagation follows.
    pub fn poke(&self, state: StateId, component: ComponentId, value: Value) -> Result<(), SimError> {
        self.request(|reply| Command::Poke {
            state,
            component,
            value,
            reply,
        })
    }

    /// Forces a net value; propagation follows.
    pub fn set(&self, state: StateId, net: NetId, value: Value) -> Result<(), SimError> {
        self.request(|reply| Command::Set {
            state,
            net,
            value,
            reply,
        })
    }

    /// Applies a structural edit between runs and waits for the result.
    pub fn edit(&self, circuit: CircuitId, transaction: Transaction) -> Result<TransactionResult, SimError> {
        self.request(|reply| Command::Edit {
            circuit,
            transaction,
            reply,
        })
    }

    /// Turns automatic ticking on or off.
    pub fn set_auto_tick(&self, enabled: bool) -> Result<(), SimError> {
        self.send(Command::SetAutoTick(enabled))
    }

    /// Changes the automatic tick rate.
    pub fn set_tick_frequency(&self, frequency: Frequency) -> Result<(), SimError> {
        self.send(Command::SetTickFrequency(frequency))
    }

    /// Blocks until every previously queued command has been handled and the
    /// resulting propagation has finished.
    pub fn sync(&self) -> Result<(), SimError> {
        self.request(|reply| Command::Sync { reply })
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.load()
    }

    /// Simulator notifications, in the order they happened.
    pub fn events(&self) -> &Receiver<SimulatorEvent> {
        &self.events
    }

    /// Measured ticks per second while auto-ticking.
    pub fn tick_rate(&self) -> Option<f64> {
        *self.tick_rate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the thread and hands back the simulator. `None` if the thread
    /// already stopped or panicked.
    pub fn shutdown(&mut self) -> Option<Simulator> {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            // Blocking send: the thread keeps draining until it sees this.
            let _ = cmd_tx.send(Command::Shutdown);
        }
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(sim) => Some(sim),
            Err(_) => {
                log::error!("simulation thread panicked");
                None
            }
        }
    }
}

impl Drop for SimulationThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SimulationThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationThread")
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

enum Wake {
    Command(Command),
    TickDue,
    Disconnected,
}

/// State held by the simulation thread's loop.
struct Worker {
    sim: Simulator,
    cmd_rx: Receiver<Command>,
    counter: TickCounter,
    tick_rate: Arc<Mutex<Option<f64>>>,
    next_tick: Instant,
}

impl Worker {
    /// Runs until shut down or every handle is gone, then returns the
    /// simulator.
    fn run(mut self) -> Simulator {
        log::info!("simulation thread started");
        loop {
            let first = match self.wait() {
                Wake::Disconnected => break,
                Wake::TickDue => {
                    self.auto_tick();
                    continue;
                }
                Wake::Command(command) => command,
            };
            if self.drain(first).is_break() {
                break;
            }
        }
        log::info!("simulation thread stopped at tick {}", self.sim.tick_count());
        self.sim
    }

    fn wait(&self) -> Wake {
        if !self.sim.is_auto_ticking() {
            return match self.cmd_rx.recv() {
                Ok(command) => Wake::Command(command),
                Err(_) => Wake::Disconnected,
            };
        }
        let now = Instant::now();
        if now >= self.next_tick {
            return Wake::TickDue;
        }
        match self.cmd_rx.recv_timeout(self.next_tick - now) {
            Ok(command) => Wake::Command(command),
            Err(RecvTimeoutError::Timeout) => Wake::TickDue,
            Err(RecvTimeoutError::Disconnected) => Wake::Disconnected,
        }
    }

    /// Handles `first` and everything already queued behind it, then
    /// propagates once if any of it changed inputs or structure.
    fn drain(&mut self, first: Command) -> ControlFlow<()> {
        let mut dirty = false;
        let mut waiting = Vec::new();
        let mut flow = self.handle(first, &mut dirty, &mut waiting);
        while flow.is_continue() {
            let Ok(command) = self.cmd_rx.try_recv() else {
                break;
            };
            flow = self.handle(command, &mut dirty, &mut waiting);
        }
        if dirty {
            self.sim.nudge();
        }
        for reply in waiting {
            let _ = reply.send(Ok(()));
        }
        flow
    }

    fn handle(&mut self, command: Command, dirty: &mut bool, waiting: &mut Vec<Reply<()>>) -> ControlFlow<()> {
        match command {
            Command::Tick { count } => {
                self.sim.tick_many(count);
            }
            Command::Nudge => *dirty = true,
            Command::Reset { reply } => {
                let _ = reply.send(self.sim.reset());
                self.counter.clear();
                self.publish_rate();
            }
            Command::Poke {
                state,
                component,
                value,
                reply,
            } => {
                let result = self.sim.poke(state, component, value);
                *dirty |= result.is_ok();
                let _ = reply.send(result);
            }
            Command::Set {
                state,
                net,
                value,
                reply,
            } => {
                let result = self.sim.set(state, net, value);
                *dirty |= result.is_ok();
                let _ = reply.send(result);
            }
            Command::Edit {
                circuit,
                transaction,
                reply,
            } => {
                let result = self.sim.edit(circuit, &transaction);
                *dirty |= result.is_ok();
                let _ = reply.send(result);
            }
            Command::SetAutoTick(enabled) => {
                self.sim.set_auto_tick(enabled);
                self.restart_pacing();
            }
            Command::SetTickFrequency(frequency) => {
                self.sim.set_tick_frequency(frequency);
                self.restart_pacing();
            }
            Command::Sync { reply } => waiting.push(reply),
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn auto_tick(&mut self) {
        self.sim.tick();
        let now = Instant::now();
        self.counter.record(now);
        self.publish_rate();
        let period = self.sim.tick_frequency().period();
        self.next_tick += period;
        if self.next_tick < now {
            // Fell behind; don't try to catch up with a burst.
            self.next_tick = now + period;
        }
    }

    fn restart_pacing(&mut self) {
        self.counter.clear();
        self.publish_rate();
        self.next_tick = Instant::now() + self.sim.tick_frequency().period();
    }

    fn publish_rate(&self) {
        *self.tick_rate.lock().unwrap_or_else(PoisonError::into_inner) = self.counter.tick_rate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_circuit::{ComponentKind, Design, Edit, Location, PinDirection, PinRef};
    use netsim_config::SimulatorConfig;

    fn design() -> Design {
        let mut d = Design::new();
        let main = d.add_circuit("main").unwrap();
        let a = d
            .add_component(
                main,
                ComponentKind::Pin {
                    width: 1,
                    direction: PinDirection::Input,
                },
                Location::new(0, 0),
            )
            .unwrap();
        let n = d
            .add_component(main, ComponentKind::Not { width: 1 }, Location::new(20, 0))
            .unwrap();
        d.add_wire(main, PinRef::new(a, 0), PinRef::new(n, 1)).unwrap();
        d
    }

    fn spawn() -> SimulationThread {
        let sim = Simulator::new(design(), SimulatorConfig::default()).unwrap();
        SimulationThread::spawn(sim).unwrap()
    }

    #[test]
    fn poke_propagates_and_publishes() {
        let thread = spawn();
        let root = thread.snapshot().root().unwrap().id;
        thread
            .poke(root, ComponentId::from_raw(0), "1".parse().unwrap())
            .unwrap();
        thread.sync().unwrap();
        let snap = thread.snapshot();
        let root = snap.root().unwrap();
        // net 0: pin + not.in, net 1: not.out
        assert_eq!(root.nets[0].to_string(), "1");
        assert_eq!(root.nets[1].to_string(), "0");
    }

    #[test]
    fn ticks_are_counted() {
        let thread = spawn();
        thread.tick_many(3).unwrap();
        thread.sync().unwrap();
        assert_eq!(thread.snapshot().tick, 3);
    }

    #[test]
    fn edit_applies_between_runs() {
        let thread = spawn();
        let main = CircuitId::from_raw(0);
        let tx = Transaction::new().with(Edit::AddComponent {
            kind: ComponentKind::Probe { width: 1 },
            location: Location::new(60, 0),
            label: None,
        });
        let result = thread.edit(main, tx).unwrap();
        assert_eq!(result.added_components().count(), 1);
        thread.sync().unwrap();
        assert_eq!(thread.snapshot().root().unwrap().nets.len(), 3);
    }

    #[test]
    fn errors_come_back_through_replies() {
        let thread = spawn();
        let err = thread
            .poke(StateId::from_raw(7), ComponentId::from_raw(0), "1".parse().unwrap())
            .unwrap_err();
        assert_eq!(err, SimError::UnknownState(7));
    }

    #[test]
    fn shutdown_returns_simulator() {
        let mut thread = spawn();
        thread.tick().unwrap();
        let sim = thread.shutdown().unwrap();
        assert_eq!(sim.tick_count(), 1);
        assert_eq!(thread.tick(), Err(SimError::Shutdown));
        assert!(thread.shutdown().is_none());
    }

    #[test]
    fn auto_tick_advances_on_its_own() {
        let thread = spawn();
        thread
            .set_tick_frequency(Frequency::from_hz(1000.0).unwrap())
            .unwrap();
        thread.set_auto_tick(true).unwrap();
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while thread.snapshot().tick < 5 && Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(thread.snapshot().tick >= 5);
        thread.set_auto_tick(false).unwrap();
        thread.sync().unwrap();
        assert_eq!(thread.tick_rate(), None);
    }

    #[test]
    fn events_are_forwarded() {
        let thread = spawn();
        thread.tick().unwrap();
        thread.sync().unwrap();
        let events: Vec<_> = thread.events().try_iter().collect();
        assert!(events.contains(&SimulatorEvent::PropagationCompleted {
            tick: 1,
            ticked: true,
            oscillating: false,
        }));
    }
}
