//! The per-group module scheduler.
//!
//! One [`Scheduler`] is the module manager of one execution group: it
//! instantiates the modules its configuration enables, resolves their
//! execution order from the declared data dependencies, and drives the
//! per-cycle loop. Setup failures (missing configuration entry, duplicate
//! production, unsortable dependency graph) are fatal and surface before any
//! cycle runs; there is no partial scheduling and no retry.
//!
//! Execution is strictly sequential: each cycle invokes every module's
//! `cycle()` exactly once, in the fixed resolved order, with no suspension
//! point in between. Cycle wall time is tracked as a rolling average over a
//! 60-sample window for observability only.

mod sort;


use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::bridge::BridgedInput;
use crate::config::{ConfigError, ScheduleConfig};
use crate::factory::ModuleRegistry;
use crate::hardware::{Clock, RobotInterface};
use crate::introspection::{DebugFrame, DebugSink, ModuleTiming};
use crate::module::{Module, ModuleContext, ModuleDescriptor, ModuleError};
use crate::store::{DataStore, StoreError};
use crate::type_registry::TypeRegistry;
use crate::types::{DataKind, GroupKind};
use crate::utils::MovingAverage;

/// Cycle-time averaging window, in cycles.
const CYCLE_TIME_WINDOW: usize = 60;

/// One module that could not be scheduled, with its unmet kinds.
#[derive(Debug, Clone)]
pub struct StuckModule {
    /// The module's configuration name.
    pub module: String,
    /// Dependencies no sorted module and no cross-group request satisfies.
    pub missing: Vec<DataKind>,
}

impl fmt::Display for StuckModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (missing", self.module)?;
        for (i, kind) in self.missing.iter().enumerate() {
            if i == 0 {
                write!(f, " {kind}")?;
            } else {
                write!(f, ", {kind}")?;
            }
        }
        write!(f, ")")
    }
}

/// The set of modules left unsorted after a no-progress pass.
#[derive(Debug, Clone)]
pub struct StuckModules(pub Vec<StuckModule>);

impl fmt::Display for StuckModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stuck) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{stuck}")?;
        }
        Ok(())
    }
}

/// Fatal setup errors. Any of these aborts startup before the first cycle.
#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    /// A module constructor failed for a module-specific reason.
    #[error("module {module} failed to initialize: {message}")]
    #[diagnostic(code(lockstep::scheduler::module_init))]
    ModuleInit { module: String, message: String },

    /// The dependency graph contains a cycle among the group's modules.
    #[error("unsatisfiable dependency graph in group {group}: {stuck}")]
    #[diagnostic(
        code(lockstep::scheduler::unsortable_modules),
        help("the listed modules depend on each other in a cycle; break it or disable one of them")
    )]
    UnsortableModules { group: GroupKind, stuck: StuckModules },
}

/// A module fault that escaped local recovery. Fatal for the cycle; the
/// group's run loop stops on it.
#[derive(Debug, Error, Diagnostic)]
#[error("module {module} faulted in cycle {cycle} of group {group}: {source}")]
#[diagnostic(code(lockstep::scheduler::cycle_fault))]
pub struct CycleError {
    /// The faulting group.
    pub group: GroupKind,
    /// The faulting module's name.
    pub module: String,
    /// The cycle counter at the time of the fault.
    pub cycle: u64,
    /// The underlying module error.
    #[source]
    pub source: ModuleError,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The cycle counter of the completed cycle (starts at 0).
    pub cycle: u64,
    /// Wall time of the completed cycle.
    pub elapsed: Duration,
    /// Rolling average over the last 60 cycles.
    pub average: Duration,
}

pub(crate) struct ScheduledModule {
    pub(crate) descriptor: ModuleDescriptor,
    pub(crate) module: Box<dyn Module>,
    pub(crate) last_elapsed: Duration,
}

/// The module manager of one execution group.
pub struct Scheduler {
    group: GroupKind,
    store: DataStore,
    modules: Vec<ScheduledModule>,
    bridged: Vec<BridgedInput>,
    hardware: Arc<dyn RobotInterface>,
    clock: Arc<dyn Clock>,
    sink: Option<DebugSink>,
    average_cycle: MovingAverage,
    cycle_index: u64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("group", &self.group)
            .field("order", &self.execution_order())
            .field("cycles", &self.cycle_index)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Builds the scheduler for one group.
    ///
    /// Runs the whole setup algorithm: instantiate every registered module
    /// the configuration enables (a registered module missing from the
    /// configuration is fatal), request every dependency no local module
    /// produces, and resolve the execution order. On success the store holds
    /// a slot for every declared kind, so first-cycle reads are defined.
    ///
    /// Requests recorded here still need [`CrossGroupBridge::wire`] before
    /// the group runs; the [`Runtime`](crate::runtime::Runtime) builder does
    /// both.
    ///
    /// [`CrossGroupBridge::wire`]: crate::bridge::CrossGroupBridge::wire
    pub fn setup(
        group: GroupKind,
        registry: &ModuleRegistry,
        config: &ScheduleConfig,
        types: Arc<TypeRegistry>,
        hardware: Arc<dyn RobotInterface>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SetupError> {
        let setup = config.group(group)?;
        let mut store = DataStore::new(group, types);
        let mut unsorted: Vec<ScheduledModule> = Vec::new();

        for factory in registry.factories(group) {
            if !setup.require(factory.name(), group)? {
                debug!(group = %group, module = factory.name(), "module disabled by configuration");
                continue;
            }
            let mut descriptor = ModuleDescriptor::new(factory.name());
            let module = {
                let mut ctx = ModuleContext::new(&mut store, &mut descriptor, &hardware);
                factory.construct(&mut ctx)?
            };
            debug!(
                group = %group,
                module = descriptor.name(),
                dependencies = descriptor.dependencies().len(),
                productions = descriptor.productions().len(),
                "instantiated module"
            );
            unsorted.push(ScheduledModule {
                descriptor,
                module,
                last_elapsed: Duration::ZERO,
            });
        }

        let mut all_dependencies: FxHashSet<DataKind> = FxHashSet::default();
        let mut all_productions: FxHashSet<DataKind> = FxHashSet::default();
        for entry in &unsorted {
            all_dependencies.extend(entry.descriptor.dependencies().iter().copied());
            all_productions.extend(entry.descriptor.productions().iter().copied());
        }

        // Every dependency nothing local produces is requested from the other
        // groups; requested kinds count as satisfied for the sort.
        let mut satisfied: FxHashSet<DataKind> = FxHashSet::default();
        for kind in all_dependencies.difference(&all_productions) {
            store.request(*kind)?;
            satisfied.insert(*kind);
        }

        let modules = sort::resolve_order(unsorted, satisfied, group)?;
        debug!(
            group = %group,
            order = ?modules.iter().map(|m| m.descriptor.name()).collect::<Vec<_>>(),
            requested = ?store.requested_kinds().collect::<Vec<_>>(),
            "resolved module execution order"
        );

        Ok(Self {
            group,
            store,
            modules,
            bridged: Vec::new(),
            hardware,
            clock,
            sink: None,
            average_cycle: MovingAverage::new(CYCLE_TIME_WINDOW),
            cycle_index: 0,
        })
    }

    /// Attaches the debug sink this scheduler publishes frames to.
    pub fn attach_debug_sink(&mut self, sink: DebugSink) {
        self.sink = Some(sink);
    }

    /// Runs one full cycle: refresh bridged inputs, then invoke every module
    /// once in the resolved order.
    ///
    /// A module returning an error aborts the cycle: such a fault already
    /// escaped the module's own safe-default recovery, so the group is
    /// considered faulted.
    pub fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let cycle_started = self.clock.now();

        for input in &mut self.bridged {
            input.refresh();
        }

        for entry in &mut self.modules {
            let module_started = self.clock.now();
            if let Err(source) = entry.module.cycle() {
                error!(
                    group = %self.group,
                    module = entry.descriptor.name(),
                    cycle = self.cycle_index,
                    %source,
                    "module fault aborted the cycle"
                );
                return Err(CycleError {
                    group: self.group,
                    module: entry.descriptor.name().to_string(),
                    cycle: self.cycle_index,
                    source,
                });
            }
            entry.last_elapsed = self.clock.now().saturating_duration_since(module_started);
        }

        let elapsed = self.clock.now().saturating_duration_since(cycle_started);
        self.average_cycle.push(elapsed.as_secs_f64());
        let average = Duration::from_secs_f64(self.average_cycle.average());

        let report = CycleReport {
            cycle: self.cycle_index,
            elapsed,
            average,
        };
        trace!(group = %self.group, cycle = report.cycle, ?elapsed, "cycle complete");

        self.publish_debug_frame(&report);
        self.cycle_index += 1;
        Ok(report)
    }

    /// The group this scheduler drives.
    #[must_use]
    pub fn group(&self) -> GroupKind {
        self.group
    }

    /// The group's data store.
    #[must_use]
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Module names in resolved execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.modules
            .iter()
            .map(|entry| entry.descriptor.name())
            .collect()
    }

    /// Number of completed cycles.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_index
    }

    /// Rolling average cycle wall time (60-sample window).
    #[must_use]
    pub fn average_cycle_time(&self) -> Duration {
        Duration::from_secs_f64(self.average_cycle.average())
    }

    /// The injected hardware interface.
    #[must_use]
    pub fn hardware(&self) -> Arc<dyn RobotInterface> {
        Arc::clone(&self.hardware)
    }

    pub(crate) fn type_registry(&self) -> &Arc<TypeRegistry> {
        self.store.type_registry()
    }

    pub(crate) fn add_bridged_input(&mut self, input: BridgedInput) {
        self.bridged.push(input);
    }

    pub(crate) fn has_bridged(&self, kind: DataKind) -> bool {
        self.bridged.iter().any(|input| input.kind() == kind)
    }

    fn publish_debug_frame(&mut self, report: &CycleReport) {
        let Some(sink) = &self.sink else {
            return;
        };
        if !sink.is_active() {
            return;
        }
        let frame = DebugFrame {
            group: self.group,
            cycle: report.cycle,
            when: Utc::now(),
            elapsed: report.elapsed,
            average: report.average,
            module_timings: self
                .modules
                .iter()
                .map(|entry| ModuleTiming {
                    module: entry.descriptor.name().to_string(),
                    elapsed: entry.last_elapsed,
                })
                .collect(),
            values: self.store.debug_values(),
        };
        sink.offer(frame);
    }
}
