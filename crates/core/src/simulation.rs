//! Simulation binding for operations
//!
//! A [`Simulation`] owns the state operations attach to and steps them.
//! Operations are attached when added to a simulation that has a state, or
//! when a state is set later, and detached when removed.

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, info, warn};

use snapview_engine::State;

use crate::action::{ActionError, ActionFlags, Operation, OperationKind};
use crate::config::CoreConfig;

new_key_type! {
    /// Key for operations added to a simulation
    pub struct OperationKey;
}

/// Error type for simulation-level operations
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// `run` was called before a state was set
    #[error("Simulation has no state")]
    NoState,

    /// `set_state` was called twice
    #[error("Simulation already has a state")]
    StateExists,

    /// An operation failed to attach
    #[error("Failed to attach operation: {0}")]
    Attach(#[source] ActionError),

    /// An operation failed while running
    #[error("Operation failed at timestep {timestep}: {source}")]
    Operation {
        timestep: u64,
        #[source]
        source: ActionError,
    },
}

/// Owner of a state and the operations run against it
pub struct Simulation {
    config: CoreConfig,
    state: Option<State>,
    timestep: u64,
    operations: SlotMap<OperationKey, Box<dyn Operation>>,
    order: Vec<OperationKey>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

impl Simulation {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            state: None,
            timestep: 0,
            operations: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    /// Bind a state and attach every operation to it
    pub fn set_state(&mut self, state: State) -> Result<(), SimulationError> {
        if self.state.is_some() {
            return Err(SimulationError::StateExists);
        }
        let mut attached = Vec::with_capacity(self.order.len());
        for &key in &self.order {
            let Some(operation) = self.operations.get_mut(key) else {
                continue;
            };
            if let Err(e) = operation.attach(&state) {
                for &done in &attached {
                    if let Some(operation) = self.operations.get_mut(done) {
                        operation.detach();
                    }
                }
                warn!("Detached {} operations after attach failure", attached.len());
                return Err(SimulationError::Attach(e));
            }
            attached.push(key);
        }
        self.state = Some(state);
        info!("Simulation state set ({} operations attached)", self.order.len());
        Ok(())
    }

    /// Unbind the state, detaching every operation
    pub fn take_state(&mut self) -> Option<State> {
        let state = self.state.take()?;
        for operation in self.operations.values_mut() {
            operation.detach();
        }
        Some(state)
    }

    /// Add an operation, attaching it if a state is set
    pub fn add<O: Operation>(&mut self, mut operation: O) -> Result<OperationKey, SimulationError> {
        operation.configure(&self.config);
        if let Some(state) = &self.state {
            operation.attach(state).map_err(SimulationError::Attach)?;
        }
        let key = self.operations.insert(Box::new(operation));
        self.order.push(key);
        debug!("Added operation {:?}", key);
        Ok(key)
    }

    /// Remove and detach an operation
    pub fn remove(&mut self, key: OperationKey) -> Option<Box<dyn Operation>> {
        let mut operation = self.operations.remove(key)?;
        self.order.retain(|&k| k != key);
        operation.detach();
        debug!("Removed operation {:?}", key);
        Some(operation)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Downcast an operation to its concrete type
    pub fn get<O: Operation>(&self, key: OperationKey) -> Option<&O> {
        self.operations.get(key)?.as_any().downcast_ref()
    }

    pub fn get_mut<O: Operation>(&mut self, key: OperationKey) -> Option<&mut O> {
        self.operations.get_mut(key)?.as_any_mut().downcast_mut()
    }

    /// Union of the flags every operation needs
    pub fn required_flags(&self) -> ActionFlags {
        self.operations
            .values()
            .fold(ActionFlags::empty(), |flags, operation| flags | operation.flags())
    }

    /// Advance `steps` timesteps
    ///
    /// Each step runs triggered analyzers, then triggered updaters, in the
    /// order they were added, at the current timestep, and then increments it.
    pub fn run(&mut self, steps: u64) -> Result<(), SimulationError> {
        if self.state.is_none() {
            return Err(SimulationError::NoState);
        }
        for _ in 0..steps {
            for kind in [OperationKind::Analyzer, OperationKind::Updater] {
                self.run_kind(kind)?;
            }
            self.timestep += 1;
        }
        Ok(())
    }

    fn run_kind(&mut self, kind: OperationKind) -> Result<(), SimulationError> {
        let timestep = self.timestep;
        for &key in &self.order {
            let Some(operation) = self.operations.get_mut(key) else {
                continue;
            };
            if operation.kind() == kind && operation.trigger().fires(timestep) {
                operation
                    .run(timestep)
                    .map_err(|source| SimulationError::Operation { timestep, source })?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("timestep", &self.timestep)
            .field("state", &self.state)
            .field("operations", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use snapview_engine::ArrayStore;
    use snapview_sdk::ParticleArray;

    use crate::action::{Action, Attachment, CustomOperation, Trigger};
    use crate::LocalSnapshot;

    type Log = Rc<RefCell<Vec<(&'static str, u64)>>>;

    /// Records when it runs and optionally pushes particles along x
    struct Recorder {
        name: &'static str,
        log: Log,
        attachment: Attachment,
        flags: ActionFlags,
        push: bool,
        refuse: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                attachment: Attachment::default(),
                flags: ActionFlags::empty(),
                push: false,
                refuse: false,
            }
        }
    }

    impl Action for Recorder {
        fn flags(&self) -> ActionFlags {
            self.flags
        }

        fn attach(&mut self, state: &State) -> Result<(), ActionError> {
            if self.refuse {
                return Err(ActionError::Failed(format!("{} refused", self.name)));
            }
            self.attachment.attach(state);
            Ok(())
        }

        fn detach(&mut self) {
            self.attachment.detach();
        }

        fn is_attached(&self) -> bool {
            self.attachment.is_attached()
        }

        fn act(&mut self, timestep: u64) -> Result<(), ActionError> {
            self.log.borrow_mut().push((self.name, timestep));
            if self.push {
                LocalSnapshot::scope(self.attachment.state()?, |snap| {
                    let position = snap.particles().get("position")?;
                    position.write(|xyz: &mut [f64]| {
                        for row in xyz.chunks_mut(3) {
                            row[0] += 1.0;
                        }
                    })?;
                    Ok::<_, ActionError>(())
                })?;
            }
            Ok(())
        }
    }

    fn state() -> State {
        State::from_particles(ArrayStore::new(2, 1))
    }

    #[test]
    fn test_run_without_state() {
        let mut sim = Simulation::default();
        assert!(matches!(sim.run(1), Err(SimulationError::NoState)));
        sim.set_state(state()).unwrap();
        assert!(matches!(
            sim.set_state(state()),
            Err(SimulationError::StateExists)
        ));
    }

    #[test]
    fn test_analyzers_run_before_updaters() {
        let log = Log::default();
        let mut sim = Simulation::default();
        sim.set_state(state()).unwrap();
        let every = Trigger::periodic(1).unwrap();
        sim.add(CustomOperation::updater(every, Recorder::new("update", &log)))
            .unwrap();
        sim.add(CustomOperation::analyzer(every, Recorder::new("analyze", &log)))
            .unwrap();

        sim.run(2).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![("analyze", 0), ("update", 0), ("analyze", 1), ("update", 1)]
        );
        assert_eq!(sim.timestep(), 2);
    }

    #[test]
    fn test_triggers_gate_runs() {
        let log = Log::default();
        let mut sim = Simulation::default();
        sim.set_state(state()).unwrap();
        let trigger = Trigger::with_phase(3, 1).unwrap();
        sim.add(CustomOperation::analyzer(trigger, Recorder::new("a", &log)))
            .unwrap();
        sim.run(8).unwrap();
        assert_eq!(*log.borrow(), vec![("a", 1), ("a", 4), ("a", 7)]);
    }

    #[test]
    fn test_attach_follows_state_and_removal() {
        let log = Log::default();
        let mut sim = Simulation::default();
        let key = sim
            .add(CustomOperation::updater(
                Trigger::periodic(1).unwrap(),
                Recorder::new("u", &log),
            ))
            .unwrap();
        assert!(!sim.get::<CustomOperation<Recorder>>(key).unwrap().is_attached());

        sim.set_state(state()).unwrap();
        assert!(sim.get::<CustomOperation<Recorder>>(key).unwrap().is_attached());

        let removed = sim.remove(key).unwrap();
        assert!(!removed.is_attached());
        assert!(sim.is_empty());

        let state = sim.take_state();
        assert!(state.is_some());
    }

    #[test]
    fn test_required_flags() {
        let log = Log::default();
        let mut sim = Simulation::default();
        let mut a = Recorder::new("a", &log);
        a.flags = ActionFlags::PRESSURE_TENSOR;
        let mut b = Recorder::new("b", &log);
        b.flags = ActionFlags::EXTERNAL_FIELD_VIRIAL;
        let every = Trigger::periodic(1).unwrap();
        sim.add(CustomOperation::updater(every, a)).unwrap();
        sim.add(CustomOperation::analyzer(every, b)).unwrap();
        assert_eq!(
            sim.required_flags(),
            ActionFlags::PRESSURE_TENSOR | ActionFlags::EXTERNAL_FIELD_VIRIAL
        );
    }

    #[test]
    fn test_updater_writes_through_local_snapshot() {
        let log = Log::default();
        let mut sim = Simulation::default();
        sim.set_state(state()).unwrap();
        let mut pusher = Recorder::new("push", &log);
        pusher.push = true;
        let key = sim
            .add(CustomOperation::updater(Trigger::periodic(2).unwrap(), pusher))
            .unwrap();

        sim.run(5).unwrap();
        let x: Vec<f64> = {
            let particles = sim.state().unwrap().particles().unwrap();
            particles
                .get::<f64>(ParticleArray::Position)
                .unwrap()
                .chunks(3)
                .map(|row| row[0])
                .collect()
        };
        // runs at 0, 2, 4; the ghost row is untouched
        assert_eq!(x, vec![3.0, 3.0, 0.0]);

        let op = sim.get_mut::<CustomOperation<Recorder>>(key).unwrap();
        assert_eq!(op.action().log.borrow().len(), 3);
    }

    #[test]
    fn test_failed_attach_detaches_earlier_operations() {
        let log = Log::default();
        let mut sim = Simulation::default();
        let every = Trigger::periodic(1).unwrap();
        let first = sim
            .add(CustomOperation::updater(every, Recorder::new("first", &log)))
            .unwrap();
        let mut bad = Recorder::new("bad", &log);
        bad.refuse = true;
        sim.add(CustomOperation::updater(every, bad)).unwrap();

        assert!(matches!(
            sim.set_state(state()),
            Err(SimulationError::Attach(ActionError::Failed(_)))
        ));
        assert!(sim.state().is_none());
        assert!(!sim.get::<CustomOperation<Recorder>>(first).unwrap().is_attached());
    }
}
