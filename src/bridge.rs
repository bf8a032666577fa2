//! Cross-group data bridging.
//!
//! Execution groups run on independent cadences, so a kind produced in one
//! group and consumed in another cannot be shared by reference. Instead, each
//! consumer group gets a [`BridgedInput`]: a link from the producing group's
//! slot to a local slot of the consumer's store. Before every consumer cycle
//! the link compares the source slot's version stamp and, only when it
//! advanced, copies the value (under the source's read lock) into the local
//! slot. Consumers read the local slot like any other dependency; their
//! [`DependencyHandle::fresh`] check distinguishes a fresh snapshot from a
//! stale repeat.
//!
//! Nothing ever blocks: if the producer has not published yet, the local slot
//! simply keeps the data type's default value and `fresh()` stays `false`.
//!
//! [`DependencyHandle::fresh`]: crate::store::DependencyHandle::fresh

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::scheduler::Scheduler;
use crate::store::Slot;
use crate::type_registry::CloneValueFn;
use crate::types::{DataKind, GroupKind};

/// Wiring errors. Fatal at setup, before any group starts running.
#[derive(Debug, Error, Diagnostic)]
pub enum BridgeError {
    /// A group requested a kind no other group produces.
    ///
    /// This is the "missing producer" half of an unresolved dependency graph;
    /// a cycle *within* a group is reported by scheduler setup instead.
    #[error("group {group} requested {kind}, but no group produces it")]
    #[diagnostic(
        code(lockstep::bridge::no_producer),
        help("enable a module that produces this kind in some group, or drop the dependency")
    )]
    NoProducer { kind: DataKind, group: GroupKind },

    /// More than one group claims production of the same requested kind.
    #[error("{kind} requested by group {group} is produced by multiple groups: {producers:?}")]
    #[diagnostic(code(lockstep::bridge::ambiguous_producer))]
    AmbiguousProducer {
        kind: DataKind,
        group: GroupKind,
        producers: Vec<GroupKind>,
    },
}

/// One wired cross-group link, owned by the consumer's scheduler.
pub struct BridgedInput {
    kind: DataKind,
    source: Arc<Slot>,
    target: Arc<Slot>,
    clone_value: CloneValueFn,
    last_version: u64,
}

impl BridgedInput {
    /// The bridged kind.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Copies the producer's latest value into the consumer's slot if it
    /// changed since the last refresh. Called by the consumer's scheduler at
    /// the start of each cycle.
    pub(crate) fn refresh(&mut self) {
        let version = self.source.version();
        if version == self.last_version {
            return;
        }
        let snapshot = {
            let guard = self.source.read_boxed();
            (self.clone_value)(guard.as_ref())
        };
        self.target.install(snapshot);
        self.last_version = version;
    }
}

/// Resolves every group's cross-group requests against the other groups'
/// productions.
pub struct CrossGroupBridge;

impl CrossGroupBridge {
    /// Wires all requested kinds between the given schedulers.
    ///
    /// For every `(kind, consumer)` request, locates the single group
    /// producing `kind` and installs a [`BridgedInput`] in the consumer.
    /// Kinds that are already wired are skipped, so calling `wire` again
    /// after adding a group is safe. A request nothing produces, or one that
    /// several groups produce, is a fatal setup error.
    pub fn wire(schedulers: &mut [Scheduler]) -> Result<(), BridgeError> {
        let mut links: Vec<(usize, usize, DataKind)> = Vec::new();

        for (consumer_index, consumer) in schedulers.iter().enumerate() {
            for kind in consumer.store().requested_kinds() {
                if consumer.has_bridged(kind) {
                    continue;
                }
                let producers: Vec<usize> = schedulers
                    .iter()
                    .enumerate()
                    .filter(|(index, scheduler)| {
                        *index != consumer_index && scheduler.store().produces(kind)
                    })
                    .map(|(index, _)| index)
                    .collect();
                match producers.as_slice() {
                    [] => {
                        return Err(BridgeError::NoProducer {
                            kind,
                            group: consumer.group(),
                        });
                    }
                    [producer_index] => links.push((consumer_index, *producer_index, kind)),
                    many => {
                        return Err(BridgeError::AmbiguousProducer {
                            kind,
                            group: consumer.group(),
                            producers: many
                                .iter()
                                .map(|index| schedulers[*index].group())
                                .collect(),
                        });
                    }
                }
            }
        }

        for (consumer_index, producer_index, kind) in links {
            let clone_value = schedulers[consumer_index]
                .type_registry()
                .spec(kind)
                .expect("requested kinds were validated against the type registry")
                .clone_fn();
            let source = schedulers[producer_index]
                .store()
                .slot(kind)
                .expect("a producing store always holds the produced slot");
            let target = schedulers[consumer_index]
                .store()
                .slot(kind)
                .expect("a requesting store always holds the requested slot");
            debug!(
                kind = %kind,
                producer = %schedulers[producer_index].group(),
                consumer = %schedulers[consumer_index].group(),
                "wired cross-group input"
            );
            schedulers[consumer_index].add_bridged_input(BridgedInput {
                kind,
                source,
                target,
                clone_value,
                last_version: 0,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde::Serialize;

    use super::{BridgeError, CrossGroupBridge};
    use crate::config::{ModuleSetup, ScheduleConfig};
    use crate::data::DataType;
    use crate::factory::{ModuleFactory, ModuleRegistry};
    use crate::hardware::{null_hardware, SystemClock};
    use crate::module::{Module, ModuleError};
    use crate::scheduler::Scheduler;
    use crate::type_registry::TypeRegistry;
    use crate::types::{DataKind, GroupKind};

    const BRAIN: GroupKind = GroupKind::new("brain");
    const MOTION: GroupKind = GroupKind::new("motion");
    const AUDIO: GroupKind = GroupKind::new("audio");

    #[derive(Clone, Default, Serialize)]
    struct MotionRequest {
        command: u32,
    }
    impl DataType for MotionRequest {
        const KIND: DataKind = DataKind::new("MotionRequest");
    }

    struct FnModule<F: FnMut() -> Result<(), ModuleError> + Send>(F);
    impl<F: FnMut() -> Result<(), ModuleError> + Send> Module for FnModule<F> {
        fn cycle(&mut self) -> Result<(), ModuleError> {
            (self.0)()
        }
    }

    fn types() -> Arc<TypeRegistry> {
        Arc::new(
            TypeRegistry::builder()
                .with::<MotionRequest>()
                .build()
                .unwrap(),
        )
    }

    /// Producer in `brain` that publishes an increasing command, but only on
    /// the cycles the script allows. Observer in `motion` records what its
    /// bridged dependency reports each cycle.
    fn wired_pair() -> (Scheduler, Scheduler, Arc<Mutex<bool>>, Arc<Mutex<Vec<(bool, u32)>>>) {
        let publish: Arc<Mutex<bool>> = Arc::new(Mutex::new(false));
        let observed: Arc<Mutex<Vec<(bool, u32)>>> = Arc::default();

        let mut registry = ModuleRegistry::new();
        let gate = publish.clone();
        registry.register_factory(
            BRAIN,
            ModuleFactory::new("Behavior", move |ctx| {
                let out = ctx.produce::<MotionRequest>()?;
                let gate = gate.clone();
                let mut command = 0u32;
                Ok(Box::new(FnModule(move || {
                    if *gate.lock() {
                        command += 1;
                        out.set(MotionRequest { command });
                    }
                    Ok(())
                })) as Box<dyn Module>)
            }),
        );
        let probe = observed.clone();
        registry.register_factory(
            MOTION,
            ModuleFactory::new("MotionDispatcher", move |ctx| {
                let input = ctx.depend::<MotionRequest>()?;
                let probe = probe.clone();
                Ok(Box::new(FnModule(move || {
                    probe.lock().push((input.fresh(), input.read().command));
                    Ok(())
                })) as Box<dyn Module>)
            }),
        );

        let config = ScheduleConfig::new()
            .with_group(BRAIN, ModuleSetup::new().with("Behavior", true))
            .with_group(MOTION, ModuleSetup::new().with("MotionDispatcher", true));
        let types = types();

        let brain = Scheduler::setup(
            BRAIN,
            &registry,
            &config,
            Arc::clone(&types),
            null_hardware(),
            Arc::new(SystemClock),
        )
        .unwrap();
        let motion = Scheduler::setup(
            MOTION,
            &registry,
            &config,
            types,
            null_hardware(),
            Arc::new(SystemClock),
        )
        .unwrap();

        (brain, motion, publish, observed)
    }

    #[test]
    fn bridged_reads_default_then_change_exactly_once_per_publication() {
        let (brain, motion, publish, observed) = wired_pair();
        let mut schedulers = [brain, motion];
        CrossGroupBridge::wire(&mut schedulers).unwrap();
        let [ref mut brain, ref mut motion] = schedulers;

        // Producer has not published yet: default value, not fresh.
        motion.run_cycle().unwrap();
        brain.run_cycle().unwrap();
        motion.run_cycle().unwrap();

        // First publication: fresh exactly once, then stale repeats.
        *publish.lock() = true;
        brain.run_cycle().unwrap();
        *publish.lock() = false;
        motion.run_cycle().unwrap();
        motion.run_cycle().unwrap();

        // Second publication becomes visible again.
        *publish.lock() = true;
        brain.run_cycle().unwrap();
        motion.run_cycle().unwrap();

        assert_eq!(
            *observed.lock(),
            [
                (false, 0),
                (false, 0),
                (true, 1),
                (false, 1),
                (true, 2),
            ]
        );
    }

    #[test]
    fn request_without_any_producer_fails_wiring() {
        let mut registry = ModuleRegistry::new();
        registry.register_factory(
            MOTION,
            ModuleFactory::new("MotionDispatcher", |ctx| {
                let input = ctx.depend::<MotionRequest>()?;
                Ok(Box::new(FnModule(move || {
                    let _ = input.fresh();
                    Ok(())
                })) as Box<dyn Module>)
            }),
        );
        let config = ScheduleConfig::new()
            .with_group(MOTION, ModuleSetup::new().with("MotionDispatcher", true));

        let motion = Scheduler::setup(
            MOTION,
            &registry,
            &config,
            types(),
            null_hardware(),
            Arc::new(SystemClock),
        )
        .unwrap();

        let mut schedulers = [motion];
        let err = CrossGroupBridge::wire(&mut schedulers).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::NoProducer { kind, group }
                if kind == MotionRequest::KIND && group == MOTION
        ));
    }

    #[test]
    fn two_producing_groups_are_ambiguous() {
        let mut registry = ModuleRegistry::new();
        for group in [BRAIN, AUDIO] {
            registry.register_factory(
                group,
                ModuleFactory::new("Behavior", |ctx| {
                    let out = ctx.produce::<MotionRequest>()?;
                    Ok(Box::new(FnModule(move || {
                        out.set(MotionRequest::default());
                        Ok(())
                    })) as Box<dyn Module>)
                }),
            );
        }
        registry.register_factory(
            MOTION,
            ModuleFactory::new("MotionDispatcher", |ctx| {
                let input = ctx.depend::<MotionRequest>()?;
                Ok(Box::new(FnModule(move || {
                    let _ = input.fresh();
                    Ok(())
                })) as Box<dyn Module>)
            }),
        );
        let config = ScheduleConfig::new()
            .with_group(BRAIN, ModuleSetup::new().with("Behavior", true))
            .with_group(AUDIO, ModuleSetup::new().with("Behavior", true))
            .with_group(MOTION, ModuleSetup::new().with("MotionDispatcher", true));
        let types = types();

        let mut schedulers: Vec<Scheduler> = [BRAIN, AUDIO, MOTION]
            .into_iter()
            .map(|group| {
                Scheduler::setup(
                    group,
                    &registry,
                    &config,
                    Arc::clone(&types),
                    null_hardware(),
                    Arc::new(SystemClock),
                )
                .unwrap()
            })
            .collect();

        let err = CrossGroupBridge::wire(&mut schedulers).unwrap_err();
        match err {
            BridgeError::AmbiguousProducer { kind, group, producers } => {
                assert_eq!(kind, MotionRequest::KIND);
                assert_eq!(group, MOTION);
                assert_eq!(producers, [BRAIN, AUDIO]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
