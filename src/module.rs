//! The module contract: one unit of work per control cycle.
//!
//! A module declares which data kinds it reads and which it writes while it
//! is constructed, then exposes a single [`cycle`](Module::cycle) entry point
//! that the scheduler invokes exactly once per tick, always in the resolved
//! dependency order. The declaration sets are fixed for the module's
//! lifetime; there is no dynamic re-declaration.
//!
//! Modules keep private state across cycles (filters, interpolators,
//! counters) but must not cache slot *values* across cycles: the ordering
//! guarantee only promises freshness within the current tick, so every cycle
//! re-reads through its [`DependencyHandle`]s.
//!
//! [`DependencyHandle`]: crate::store::DependencyHandle

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::data::DataType;
use crate::hardware::RobotInterface;
use crate::scheduler::SetupError;
use crate::store::{DataStore, DependencyHandle, ProductionHandle};
use crate::types::{DataKind, GroupKind};

/// A fault inside one module's `cycle()`.
///
/// Returning an error here is fatal for the whole cycle: the scheduler has no
/// generic per-module recovery. Modules are expected to prefer local
/// recovery, publishing a safe default output (a behavior module falls back
/// to "stand still", a filter re-publishes its reset state), and to reserve
/// `Err` for states where no safe default exists.
#[derive(Debug, Error, Diagnostic)]
pub enum ModuleError {
    /// An upstream value was structurally invalid for this module.
    #[error("invalid upstream input: {what}")]
    #[diagnostic(code(lockstep::module::invalid_input))]
    InvalidInput { what: &'static str },

    /// The hardware interface reported a failure.
    #[error("hardware error: {message}")]
    #[diagnostic(code(lockstep::module::hardware))]
    Hardware { message: String },

    /// Any other unrecoverable module fault.
    #[error("module fault: {0}")]
    #[diagnostic(code(lockstep::module::fault))]
    Fault(String),
}

/// A unit of work driven once per control cycle.
///
/// Polymorphic over the single capability `cycle()`; the variants are every
/// registered module type of the process.
pub trait Module: Send {
    /// Runs one tick of this module.
    ///
    /// All needed values must be read through dependency handles and all
    /// produced values written through production handles before returning.
    /// The call must complete; there is no suspension point inside a cycle.
    fn cycle(&mut self) -> Result<(), ModuleError>;
}

/// A module type that can be registered with a
/// [`ModuleRegistry`](crate::factory::ModuleRegistry).
///
/// `construct` runs at scheduler setup. It declares the module's data-kind
/// sets by calling [`ModuleContext::depend`] and [`ModuleContext::produce`]
/// and stores the returned handles for use in `cycle()`.
pub trait ModuleDef: Module + Sized + 'static {
    /// The configuration name of this module. Must be unique within its
    /// execution group; the enablement map is keyed by it.
    const NAME: &'static str;

    /// Builds the module, declaring its dependencies and productions.
    fn construct(ctx: &mut ModuleContext<'_>) -> Result<Self, SetupError>;
}

/// Static metadata of one module instance: its name and the data kinds it
/// consumes and produces. Collected during construction, immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    name: String,
    dependencies: FxHashSet<DataKind>,
    productions: FxHashSet<DataKind>,
}

impl ModuleDescriptor {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: FxHashSet::default(),
            productions: FxHashSet::default(),
        }
    }

    /// The module's configuration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kinds this module reads.
    #[must_use]
    pub fn dependencies(&self) -> &FxHashSet<DataKind> {
        &self.dependencies
    }

    /// Kinds this module writes.
    #[must_use]
    pub fn productions(&self) -> &FxHashSet<DataKind> {
        &self.productions
    }

    pub(crate) fn record_dependency(&mut self, kind: DataKind) {
        self.dependencies.insert(kind);
    }

    pub(crate) fn record_production(&mut self, kind: DataKind) {
        self.productions.insert(kind);
    }
}

/// Construction-time view of the scheduler handed to
/// [`ModuleDef::construct`].
///
/// Every `depend`/`produce` call both records the kind in the module's
/// descriptor (the input to dependency resolution) and binds a handle to the
/// group's store.
pub struct ModuleContext<'a> {
    store: &'a mut DataStore,
    descriptor: &'a mut ModuleDescriptor,
    hardware: &'a Arc<dyn RobotInterface>,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(
        store: &'a mut DataStore,
        descriptor: &'a mut ModuleDescriptor,
        hardware: &'a Arc<dyn RobotInterface>,
    ) -> Self {
        Self {
            store,
            descriptor,
            hardware,
        }
    }

    /// Declares a read dependency on `T` and returns its handle.
    pub fn depend<T: DataType>(&mut self) -> Result<DependencyHandle<T>, SetupError> {
        let handle = self.store.declare_dependency::<T>()?;
        self.descriptor.record_dependency(T::KIND);
        Ok(handle)
    }

    /// Claims production of `T` and returns the single write handle.
    ///
    /// Fails if another module of the group already claimed the kind.
    pub fn produce<T: DataType>(&mut self) -> Result<ProductionHandle<T>, SetupError> {
        let name = self.descriptor.name().to_string();
        let handle = self.store.produce::<T>(name)?;
        self.descriptor.record_production(T::KIND);
        Ok(handle)
    }

    /// The injected robot hardware interface.
    #[must_use]
    pub fn hardware(&self) -> Arc<dyn RobotInterface> {
        Arc::clone(self.hardware)
    }

    /// The execution group this module is being constructed for.
    #[must_use]
    pub fn group(&self) -> GroupKind {
        self.store.group()
    }
}
