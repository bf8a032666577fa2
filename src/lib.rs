//! # Lockstep: dependency-driven robot control scheduling
//!
//! Lockstep is the control backbone of a humanoid robot: many small modules
//! (perception filters, behavior, motion control, network reporting) that
//! must run in lock-step, once per control cycle, exchanging strongly-typed
//! data with hard dependency ordering.
//!
//! ## Core concepts
//!
//! - **Data kinds**: every value flowing between modules implements
//!   [`DataType`](data::DataType) and is identified by a
//!   [`DataKind`](types::DataKind)
//! - **Store**: each execution group owns a [`DataStore`](store::DataStore)
//!   of slots, accessed through typed
//!   [`DependencyHandle`](store::DependencyHandle)s and
//!   [`ProductionHandle`](store::ProductionHandle)s
//! - **Modules**: units of work with one [`cycle()`](module::Module::cycle)
//!   entry point, declaring what they read and write at construction
//! - **Scheduler**: per group, resolves a deterministic execution order from
//!   the declarations and drives the cycle loop
//! - **Bridge**: exposes kinds produced in one group to consumers in another,
//!   with explicit staleness semantics
//!
//! ## Quick start
//!
//! One group, one producer, one consumer:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use lockstep::config::{ModuleSetup, ScheduleConfig};
//! use lockstep::data::DataType;
//! use lockstep::factory::ModuleRegistry;
//! use lockstep::hardware::{null_hardware, SystemClock};
//! use lockstep::module::{Module, ModuleContext, ModuleDef, ModuleError};
//! use lockstep::scheduler::{Scheduler, SetupError};
//! use lockstep::store::{DependencyHandle, ProductionHandle};
//! use lockstep::type_registry::TypeRegistry;
//! use lockstep::types::{DataKind, GroupKind};
//! use serde::Serialize;
//!
//! const MOTION: GroupKind = GroupKind::new("motion");
//!
//! #[derive(Clone, Default, Serialize)]
//! struct HeadTarget {
//!     yaw: f32,
//! }
//! impl DataType for HeadTarget {
//!     const KIND: DataKind = DataKind::new("HeadTarget");
//! }
//!
//! struct HeadPlanner {
//!     target: ProductionHandle<HeadTarget>,
//! }
//! impl ModuleDef for HeadPlanner {
//!     const NAME: &'static str = "HeadPlanner";
//!     fn construct(ctx: &mut ModuleContext<'_>) -> Result<Self, SetupError> {
//!         Ok(Self {
//!             target: ctx.produce()?,
//!         })
//!     }
//! }
//! impl Module for HeadPlanner {
//!     fn cycle(&mut self) -> Result<(), ModuleError> {
//!         self.target.set(HeadTarget { yaw: 0.4 });
//!         Ok(())
//!     }
//! }
//!
//! struct HeadDriver {
//!     target: DependencyHandle<HeadTarget>,
//! }
//! impl ModuleDef for HeadDriver {
//!     const NAME: &'static str = "HeadDriver";
//!     fn construct(ctx: &mut ModuleContext<'_>) -> Result<Self, SetupError> {
//!         Ok(Self {
//!             target: ctx.depend()?,
//!         })
//!     }
//! }
//! impl Module for HeadDriver {
//!     fn cycle(&mut self) -> Result<(), ModuleError> {
//!         let _yaw = self.target.read().yaw;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let types = Arc::new(TypeRegistry::builder().with::<HeadTarget>().build()?);
//!
//!     // Registration order is the deterministic tie-break; the resolved
//!     // order still puts the planner first.
//!     let registry = ModuleRegistry::new()
//!         .with_module::<HeadDriver>(MOTION)
//!         .with_module::<HeadPlanner>(MOTION);
//!
//!     let config = ScheduleConfig::new().with_group(
//!         MOTION,
//!         ModuleSetup::new()
//!             .with("HeadPlanner", true)
//!             .with("HeadDriver", true),
//!     );
//!
//!     let mut scheduler = Scheduler::setup(
//!         MOTION,
//!         &registry,
//!         &config,
//!         types,
//!         null_hardware(),
//!         Arc::new(SystemClock),
//!     )?;
//!     assert_eq!(scheduler.execution_order(), ["HeadPlanner", "HeadDriver"]);
//!
//!     scheduler.run_cycle()?;
//!     Ok(())
//! }
//! ```
//!
//! Multiple groups on independent cadences are assembled through
//! [`Runtime::builder`](runtime::Runtime::builder), which also wires
//! cross-group requests via the [`bridge`].
//!
//! ## Failure model
//!
//! Setup failures (a registered module missing from the configuration, two
//! producers for one kind, a dependency cycle, a request no group serves)
//! are fatal and abort startup before any cycle runs. At runtime the only
//! fatal condition is a module fault that escaped the module's own
//! safe-default recovery; stale cross-group values are not errors but an
//! observable state (see [`DependencyHandle::fresh`](store::DependencyHandle::fresh)).
//!
//! ## Module guide
//!
//! - [`types`] - `DataKind` / `GroupKind` identifiers
//! - [`data`] - the `DataType` contract
//! - [`type_registry`] - process-wide kind catalogue
//! - [`store`] - per-group slots and typed handles
//! - [`module`] - the module contract and construction context
//! - [`factory`] - per-group module registry
//! - [`scheduler`] - dependency resolution and the cycle loop
//! - [`bridge`] - cross-group data requests
//! - [`runtime`] - multi-group assembly and cadenced run loops
//! - [`config`] - module enablement maps
//! - [`introspection`] - best-effort debug frames
//! - [`hardware`] - injected robot/clock collaborators
//! - [`telemetry`] - tracing setup

pub mod bridge;
pub mod config;
pub mod data;
pub mod factory;
pub mod hardware;
pub mod introspection;
pub mod module;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod type_registry;
pub mod types;
pub mod utils;
