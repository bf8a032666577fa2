//! Storage cell for one data kind.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::data::{BoxedValue, DataType};
use crate::types::DataKind;

/// Read guard over one typed slot value.
pub type SlotRef<'a, T> = MappedRwLockReadGuard<'a, T>;

pub(crate) type SlotMut<'a, T> = MappedRwLockWriteGuard<'a, T>;

/// One storage cell inside a [`DataStore`](crate::store::DataStore).
///
/// A slot holds the current value for one [`DataKind`] plus a version stamp
/// that counts publications. Version `0` means "never produced": consumers
/// observe the defined default value of the data type. The stamp is what the
/// cross-group bridge and [`DependencyHandle::fresh`] freshness checks compare
/// against, so a slot never needs a separate "touched this cycle" flag.
///
/// Within a group the slot is written by exactly one producing module and read
/// by any number of later modules in the same cycle. Across groups the value
/// is copied out under the read lock, so bridged readers never observe a
/// half-written value.
///
/// [`DependencyHandle::fresh`]: crate::store::DependencyHandle::fresh
pub struct Slot {
    kind: DataKind,
    value: RwLock<BoxedValue>,
    version: AtomicU64,
}

impl Slot {
    pub(crate) fn new(kind: DataKind, initial: BoxedValue) -> Self {
        Self {
            kind,
            value: RwLock::new(initial),
            version: AtomicU64::new(0),
        }
    }

    /// The kind stored in this slot.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The publication count. `0` until the first production.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Replaces the value and stamps a new version.
    pub(crate) fn install(&self, value: BoxedValue) {
        *self.value.write() = value;
        self.bump();
    }

    pub(crate) fn bump(&self) {
        self.version.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn read_boxed(&self) -> RwLockReadGuard<'_, BoxedValue> {
        self.value.read()
    }

    /// Typed read access. `None` if the slot holds a different type, which the
    /// store rules out for every handle it gives out.
    pub(crate) fn read_typed<T: DataType>(&self) -> Option<SlotRef<'_, T>> {
        RwLockReadGuard::try_map(self.value.read(), |boxed| boxed.downcast_ref::<T>()).ok()
    }

    pub(crate) fn write_typed<T: DataType>(&self) -> Option<SlotMut<'_, T>> {
        RwLockWriteGuard::try_map(self.value.write(), |boxed| boxed.downcast_mut::<T>()).ok()
    }
}
