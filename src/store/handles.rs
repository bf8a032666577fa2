//! Typed capability objects bound to one slot.
//!
//! Modules never touch the [`DataStore`](crate::store::DataStore) directly
//! during a cycle. At construction time they obtain handles through
//! [`ModuleContext`](crate::module::ModuleContext); the handles stay valid for
//! the lifetime of the owning store and are the only per-cycle access path.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::slot::{Slot, SlotRef};
use crate::data::DataType;
use crate::types::DataKind;

/// Read capability for one data kind.
///
/// Holding a `DependencyHandle<T>` means the scheduler guaranteed at setup
/// that `T` is produced before this module runs, either by an earlier module
/// in the same group or, for bridged kinds, by another group whose latest
/// snapshot is copied in before each cycle.
pub struct DependencyHandle<T: DataType> {
    slot: Arc<Slot>,
    last_seen: Cell<u64>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: DataType> DependencyHandle<T> {
    pub(crate) fn new(slot: Arc<Slot>) -> Self {
        Self {
            slot,
            last_seen: Cell::new(0),
            _kind: PhantomData,
        }
    }

    /// The kind this handle reads.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.slot.kind()
    }

    /// Borrows the current value.
    ///
    /// Before the producer has run for the first time this is the data type's
    /// default. The guard holds the slot's read lock; drop it before the end
    /// of the module's `cycle()` and never cache the value across cycles.
    #[must_use]
    pub fn read(&self) -> SlotRef<'_, T> {
        self.slot
            .read_typed::<T>()
            .expect("dependency handle is bound to a slot of its own type")
    }

    /// Clones the current value out of the slot.
    #[must_use]
    pub fn get(&self) -> T {
        self.read().clone()
    }

    /// Whether the value changed since this handle last asked.
    ///
    /// Returns `true` exactly once per publication: a consumer polling every
    /// cycle sees `true` on the first cycle after the producer published and
    /// `false` until it publishes again. For bridged kinds this is the
    /// staleness signal: `false` means the producing group has not delivered
    /// a new value yet and the slot still holds the previous (or default)
    /// snapshot.
    pub fn fresh(&self) -> bool {
        let version = self.slot.version();
        let changed = version != self.last_seen.get();
        self.last_seen.set(version);
        changed
    }

    /// The slot's publication count (0 until first production).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.version()
    }
}

impl<T: DataType> fmt::Debug for DependencyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyHandle")
            .field("kind", &self.kind())
            .field("version", &self.version())
            .finish()
    }
}

/// Write capability for one data kind.
///
/// At most one module per group holds the production handle for a kind; the
/// store enforces this at setup. Each publication stamps a new slot version,
/// which downstream [`DependencyHandle::fresh`] calls and the cross-group
/// bridge observe.
pub struct ProductionHandle<T: DataType> {
    slot: Arc<Slot>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: DataType> ProductionHandle<T> {
    pub(crate) fn new(slot: Arc<Slot>) -> Self {
        Self {
            slot,
            _kind: PhantomData,
        }
    }

    /// The kind this handle writes.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.slot.kind()
    }

    /// Publishes a whole new value.
    pub fn set(&self, value: T) {
        self.slot.install(Box::new(value));
    }

    /// Mutates the slot value in place, then stamps a new version.
    ///
    /// Preferred for large values that are updated incrementally (the
    /// original slot allocation is reused).
    pub fn update(&self, mutate: impl FnOnce(&mut T)) {
        {
            let mut guard = self
                .slot
                .write_typed::<T>()
                .expect("production handle is bound to a slot of its own type");
            mutate(&mut guard);
        }
        self.slot.bump();
    }

    /// Publishes the data type's defined default state.
    pub fn reset(&self) {
        self.update(T::reset);
    }
}

impl<T: DataType> fmt::Debug for ProductionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductionHandle")
            .field("kind", &self.kind())
            .finish()
    }
}
