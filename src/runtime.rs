//! Assembling and running a whole robot: several execution groups on
//! independent cadences.
//!
//! [`RuntimeBuilder`] performs the complete setup (one scheduler per
//! configured group, then cross-group wiring) and fails fast on any setup
//! error, before a single cycle has run. [`Runtime::spawn`] then starts one
//! tokio task per group, each ticking its scheduler at the group's own
//! period. Module cycles stay synchronous inside the tick; only the cadence
//! and shutdown plumbing are async.

use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::bridge::{BridgeError, CrossGroupBridge};
use crate::config::ScheduleConfig;
use crate::factory::ModuleRegistry;
use crate::hardware::{Clock, NullRobot, RobotInterface, SystemClock};
use crate::introspection::DebugSink;
use crate::scheduler::{CycleError, Scheduler, SetupError};
use crate::type_registry::TypeRegistry;
use crate::types::GroupKind;

/// Errors from runtime assembly and execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Bridge(#[from] BridgeError),

    /// The same group was added to the builder twice.
    #[error("execution group {group} configured twice")]
    #[diagnostic(code(lockstep::runtime::duplicate_group))]
    DuplicateGroup { group: GroupKind },

    /// A group's run loop ended with a module fault.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cycle(#[from] CycleError),

    /// A group task panicked or was aborted.
    #[error("group task failed to join: {0}")]
    #[diagnostic(code(lockstep::runtime::join))]
    Join(#[from] JoinError),
}

/// Builder for a [`Runtime`].
pub struct RuntimeBuilder {
    types: Arc<TypeRegistry>,
    registry: ModuleRegistry,
    config: ScheduleConfig,
    hardware: Arc<dyn RobotInterface>,
    clock: Arc<dyn Clock>,
    sink: Option<DebugSink>,
    groups: Vec<(GroupKind, Duration)>,
}

impl RuntimeBuilder {
    /// Adds an execution group with its cycle period.
    #[must_use]
    pub fn with_group(mut self, group: GroupKind, period: Duration) -> Self {
        self.groups.push((group, period));
        self
    }

    /// Injects the robot hardware backend (default: [`NullRobot`]).
    #[must_use]
    pub fn with_hardware(mut self, hardware: Arc<dyn RobotInterface>) -> Self {
        self.hardware = hardware;
        self
    }

    /// Injects the time source (default: [`SystemClock`]).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches a debug sink; every group publishes its frames to it.
    #[must_use]
    pub fn with_debug_sink(mut self, sink: DebugSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Runs the full setup: every group's scheduler, then cross-group wiring.
    ///
    /// Any configuration error, duplicate production, dependency cycle or
    /// unresolvable cross-group request fails here, before any cycle runs.
    pub fn build(self) -> Result<Runtime, RuntimeError> {
        let mut schedulers: Vec<Scheduler> = Vec::with_capacity(self.groups.len());
        let mut periods: Vec<Duration> = Vec::with_capacity(self.groups.len());

        for (group, period) in &self.groups {
            if schedulers.iter().any(|s| s.group() == *group) {
                return Err(RuntimeError::DuplicateGroup { group: *group });
            }
            let mut scheduler = Scheduler::setup(
                *group,
                &self.registry,
                &self.config,
                Arc::clone(&self.types),
                Arc::clone(&self.hardware),
                Arc::clone(&self.clock),
            )?;
            if let Some(sink) = &self.sink {
                scheduler.attach_debug_sink(sink.clone());
            }
            schedulers.push(scheduler);
            periods.push(*period);
        }

        CrossGroupBridge::wire(&mut schedulers)?;
        info!(
            groups = ?schedulers.iter().map(Scheduler::group).collect::<Vec<_>>(),
            "runtime setup complete"
        );

        Ok(Runtime {
            schedulers,
            periods,
        })
    }
}

/// A fully wired robot control runtime, ready to spawn.
pub struct Runtime {
    schedulers: Vec<Scheduler>,
    periods: Vec<Duration>,
}

impl Runtime {
    /// Starts assembling a runtime.
    #[must_use]
    pub fn builder(
        types: Arc<TypeRegistry>,
        registry: ModuleRegistry,
        config: ScheduleConfig,
    ) -> RuntimeBuilder {
        RuntimeBuilder {
            types,
            registry,
            config,
            hardware: Arc::new(NullRobot),
            clock: Arc::new(SystemClock),
            sink: None,
            groups: Vec::new(),
        }
    }

    /// The scheduler of one group, for pre-spawn inspection.
    #[must_use]
    pub fn scheduler(&self, group: GroupKind) -> Option<&Scheduler> {
        self.schedulers.iter().find(|s| s.group() == group)
    }

    /// Drives every group once, in configuration order.
    ///
    /// Useful for tests and simulators that step time by hand instead of
    /// spawning the cadenced loops.
    pub fn step_all(&mut self) -> Result<(), CycleError> {
        for scheduler in &mut self.schedulers {
            scheduler.run_cycle()?;
        }
        Ok(())
    }

    /// Spawns one tokio task per group, each ticking at the group's period.
    ///
    /// Must be called from within a tokio runtime. A module fault stops only
    /// the faulted group's task; the error is returned from
    /// [`RuntimeHandle::join`].
    #[must_use]
    pub fn spawn(self) -> RuntimeHandle {
        let (shutdown_tx, _) = watch::channel(false);
        let mut tasks = Vec::with_capacity(self.schedulers.len());

        for (scheduler, period) in self.schedulers.into_iter().zip(self.periods) {
            let mut shutdown = shutdown_tx.subscribe();
            tasks.push(tokio::spawn(async move {
                let mut scheduler = scheduler;
                let group = scheduler.group();
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                debug!(group = %group, ?period, "group loop started");
                loop {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                debug!(group = %group, cycles = scheduler.cycle_count(), "group loop stopped");
                                return Ok(());
                            }
                        }
                        _ = ticker.tick() => {
                            if let Err(err) = scheduler.run_cycle() {
                                error!(group = %group, %err, "group loop faulted");
                                return Err(err);
                            }
                        }
                    }
                }
            }));
        }

        RuntimeHandle {
            tasks,
            shutdown: shutdown_tx,
        }
    }
}

/// Handle over the spawned group tasks.
pub struct RuntimeHandle {
    tasks: Vec<JoinHandle<Result<(), CycleError>>>,
    shutdown: watch::Sender<bool>,
}

impl RuntimeHandle {
    /// Signals every group loop to stop after its current cycle.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Waits for all group tasks; the first fault wins.
    pub async fn join(self) -> Result<(), RuntimeError> {
        let mut first_fault: Option<RuntimeError> = None;
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(cycle)) => {
                    first_fault.get_or_insert(RuntimeError::Cycle(cycle));
                }
                Err(join) => {
                    first_fault.get_or_insert(RuntimeError::Join(join));
                }
            }
        }
        match first_fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Convenience: signal shutdown, then wait for all groups.
    pub async fn stop(self) -> Result<(), RuntimeError> {
        self.shutdown();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleSetup;
    use crate::data::DataType;
    use crate::factory::ModuleFactory;
    use crate::introspection::DebugSink;
    use crate::module::{Module, ModuleError};
    use crate::types::DataKind;
    use serde::Serialize;

    const BRAIN: GroupKind = GroupKind::new("brain");
    const MOTION: GroupKind = GroupKind::new("motion");

    #[derive(Clone, Default, Serialize)]
    struct MotionRequest {
        walk: bool,
    }
    impl DataType for MotionRequest {
        const KIND: DataKind = DataKind::new("MotionRequest");
    }

    struct Behavior {
        out: crate::store::ProductionHandle<MotionRequest>,
    }
    impl Module for Behavior {
        fn cycle(&mut self) -> Result<(), ModuleError> {
            self.out.set(MotionRequest { walk: true });
            Ok(())
        }
    }

    struct MotionDispatcher {
        input: crate::store::DependencyHandle<MotionRequest>,
    }
    impl Module for MotionDispatcher {
        fn cycle(&mut self) -> Result<(), ModuleError> {
            let _ = self.input.fresh();
            Ok(())
        }
    }

    fn two_group_runtime(sink: DebugSink) -> Runtime {
        let types = Arc::new(
            TypeRegistry::builder()
                .with::<MotionRequest>()
                .build()
                .unwrap(),
        );
        let registry = ModuleRegistry::new()
            .with_factory(
                BRAIN,
                ModuleFactory::new("Behavior", |ctx| {
                    Ok(Box::new(Behavior {
                        out: ctx.produce()?,
                    }) as Box<dyn Module>)
                }),
            )
            .with_factory(
                MOTION,
                ModuleFactory::new("MotionDispatcher", |ctx| {
                    Ok(Box::new(MotionDispatcher {
                        input: ctx.depend()?,
                    }) as Box<dyn Module>)
                }),
            );
        let config = ScheduleConfig::new()
            .with_group(BRAIN, ModuleSetup::new().with("Behavior", true))
            .with_group(MOTION, ModuleSetup::new().with("MotionDispatcher", true));

        Runtime::builder(types, registry, config)
            .with_group(BRAIN, Duration::from_millis(5))
            .with_group(MOTION, Duration::from_millis(3))
            .with_debug_sink(sink)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn groups_tick_until_shutdown() {
        let (sink, stream) = DebugSink::bounded(256);
        let handle = two_group_runtime(sink).spawn();

        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop().await.unwrap();

        let frames = stream.drain();
        assert!(frames.iter().any(|f| f.group == BRAIN));
        assert!(frames.iter().any(|f| f.group == MOTION));
    }

    #[test]
    fn duplicate_groups_are_rejected() {
        let types = Arc::new(TypeRegistry::builder().build().unwrap());
        let config = ScheduleConfig::new()
            .with_group(BRAIN, ModuleSetup::new())
            .with_group(BRAIN, ModuleSetup::new());
        let result = Runtime::builder(types, ModuleRegistry::new(), config)
            .with_group(BRAIN, Duration::from_millis(10))
            .with_group(BRAIN, Duration::from_millis(10))
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::DuplicateGroup { group }) if group == BRAIN
        ));
    }

    #[test]
    fn step_all_drives_every_group_once() {
        let (sink, _stream) = DebugSink::bounded(16);
        let mut runtime = two_group_runtime(sink);
        runtime.step_all().unwrap();
        assert_eq!(runtime.scheduler(BRAIN).unwrap().cycle_count(), 1);
        assert_eq!(runtime.scheduler(MOTION).unwrap().cycle_count(), 1);
    }
}
