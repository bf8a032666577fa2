//! The per-group typed data store.
//!
//! Each execution group owns one [`DataStore`]: a set of [`Slot`]s, one per
//! [`DataKind`] that is produced in the group or requested from another
//! group. Modules access slots exclusively through the typed handles handed
//! out during setup ([`DependencyHandle`], [`ProductionHandle`]); the store
//! itself only participates in setup and in debug serialization.
//!
//! Values are mutated in place; there is no copy-on-write. A consumer in the
//! same group observes whatever the producer wrote this cycle, which is why
//! the scheduler orders producers before their consumers. Cross-group readers
//! get a copied snapshot via the bridge instead of a shared borrow.

mod handles;
mod slot;

#[cfg(test)]
mod tests;

pub use handles::{DependencyHandle, ProductionHandle};
pub use slot::{Slot, SlotRef};

use std::any;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use thiserror::Error;

use crate::data::DataType;
use crate::type_registry::TypeRegistry;
use crate::types::{DataKind, GroupKind};

/// Errors raised by store operations. All of them are setup-time errors; once
/// a group is running, slot access can no longer fail.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// A module declared a kind the process bootstrap never registered.
    #[error("data kind {kind} is not registered in the type registry")]
    #[diagnostic(
        code(lockstep::store::unregistered_kind),
        help("register the data type with TypeRegistry::builder() before constructing schedulers")
    )]
    UnregisteredKind { kind: DataKind },

    /// A module declared a kind under a different Rust type than the one
    /// registered for it.
    #[error("data kind {kind} is registered as {registered} but was declared as {declared}")]
    #[diagnostic(code(lockstep::store::kind_type_mismatch))]
    KindTypeMismatch {
        kind: DataKind,
        registered: &'static str,
        declared: &'static str,
    },

    /// Two modules in one group claimed production of the same kind.
    #[error("duplicate production of {kind}: claimed by {first} and {second}")]
    #[diagnostic(
        code(lockstep::store::duplicate_production),
        help("exactly one module per group may produce a given data kind")
    )]
    DuplicateProduction {
        kind: DataKind,
        first: String,
        second: String,
    },

    /// `get` was called for a kind no module in this group produces or
    /// requests.
    #[error("no slot for data kind {kind} in group {group}")]
    #[diagnostic(code(lockstep::store::missing_slot))]
    MissingSlot { kind: DataKind, group: GroupKind },
}

/// Container of all slots of one execution group.
pub struct DataStore {
    group: GroupKind,
    types: Arc<TypeRegistry>,
    slots: FxHashMap<DataKind, Arc<Slot>>,
    producers: FxHashMap<DataKind, String>,
    requests: FxHashSet<DataKind>,
}

impl DataStore {
    /// Creates an empty store for one group.
    #[must_use]
    pub fn new(group: GroupKind, types: Arc<TypeRegistry>) -> Self {
        Self {
            group,
            types,
            slots: FxHashMap::default(),
            producers: FxHashMap::default(),
            requests: FxHashSet::default(),
        }
    }

    /// The group this store belongs to.
    #[must_use]
    pub fn group(&self) -> GroupKind {
        self.group
    }

    /// Declares that this store holds authoritative values for `T` and hands
    /// out the single write capability.
    ///
    /// Fails if another module already claimed production of the same kind,
    /// a configuration error that is fatal at setup.
    pub fn produce<T: DataType>(
        &mut self,
        producer: impl Into<String>,
    ) -> Result<ProductionHandle<T>, StoreError> {
        let producer = producer.into();
        if let Some(first) = self.producers.get(&T::KIND) {
            return Err(StoreError::DuplicateProduction {
                kind: T::KIND,
                first: first.clone(),
                second: producer,
            });
        }
        let slot = self.ensure_slot::<T>()?;
        self.producers.insert(T::KIND, producer);
        Ok(ProductionHandle::new(slot))
    }

    /// Declares a read dependency on `T` and hands out a read capability.
    ///
    /// The slot is allocated (with the type's default value) the first time
    /// any module declares the kind, so the handle is valid immediately even
    /// though the producer may only be constructed later.
    pub fn declare_dependency<T: DataType>(&mut self) -> Result<DependencyHandle<T>, StoreError> {
        let slot = self.ensure_slot::<T>()?;
        Ok(DependencyHandle::new(slot))
    }

    /// Marks `kind` as needed by this group although no local module produces
    /// it. Idempotent. The cross-group bridge resolves all requests against
    /// the other groups' productions before the first cycle.
    pub fn request(&mut self, kind: DataKind) -> Result<(), StoreError> {
        let spec = self
            .types
            .spec(kind)
            .ok_or(StoreError::UnregisteredKind { kind })?;
        self.slots
            .entry(kind)
            .or_insert_with(|| Arc::new(Slot::new(kind, spec.instantiate())));
        self.requests.insert(kind);
        Ok(())
    }

    /// Borrows the current value for `T`.
    ///
    /// Intended for tooling and tests; modules read through their
    /// [`DependencyHandle`]s instead. Before the first production this is the
    /// type's default value.
    pub fn get<T: DataType>(&self) -> Result<SlotRef<'_, T>, StoreError> {
        let slot = self.slots.get(&T::KIND).ok_or(StoreError::MissingSlot {
            kind: T::KIND,
            group: self.group,
        })?;
        slot.read_typed::<T>().ok_or(StoreError::KindTypeMismatch {
            kind: T::KIND,
            registered: self
                .types
                .spec(T::KIND)
                .map_or("<unregistered>", |spec| spec.type_name()),
            declared: any::type_name::<T>(),
        })
    }

    /// Whether a module of this group claimed production of `kind`.
    #[must_use]
    pub fn produces(&self, kind: DataKind) -> bool {
        self.producers.contains_key(&kind)
    }

    /// The name of the module producing `kind`, if any.
    #[must_use]
    pub fn producer(&self, kind: DataKind) -> Option<&str> {
        self.producers.get(&kind).map(String::as_str)
    }

    /// Kinds this store requested from other groups.
    pub fn requested_kinds(&self) -> impl Iterator<Item = DataKind> + '_ {
        self.requests.iter().copied()
    }

    /// The slot for `kind`, if one was declared.
    #[must_use]
    pub fn slot(&self, kind: DataKind) -> Option<Arc<Slot>> {
        self.slots.get(&kind).cloned()
    }

    pub(crate) fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Serializes every slot value for the debug sink. Best effort: kinds
    /// whose serialization fails render as `null`.
    #[must_use]
    pub fn debug_values(&self) -> FxHashMap<String, Value> {
        let mut values = FxHashMap::default();
        for (kind, slot) in &self.slots {
            if let Some(spec) = self.types.spec(*kind) {
                let guard = slot.read_boxed();
                values.insert(kind.as_str().to_string(), spec.render_json(guard.as_ref()));
            }
        }
        values
    }

    fn ensure_slot<T: DataType>(&mut self) -> Result<Arc<Slot>, StoreError> {
        let spec = self
            .types
            .spec(T::KIND)
            .ok_or(StoreError::UnregisteredKind { kind: T::KIND })?;
        if spec.type_name() != any::type_name::<T>() {
            return Err(StoreError::KindTypeMismatch {
                kind: T::KIND,
                registered: spec.type_name(),
                declared: any::type_name::<T>(),
            });
        }
        let slot = self
            .slots
            .entry(T::KIND)
            .or_insert_with(|| Arc::new(Slot::new(T::KIND, spec.instantiate())));
        Ok(Arc::clone(slot))
    }
}
