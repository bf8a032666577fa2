//! Process-wide catalogue of data kinds.
//!
//! The [`TypeRegistry`] maps every [`DataKind`] to the [`SlotSpec`] needed to
//! manage its slot generically: how to build the default value, how to clone
//! a snapshot for the cross-group bridge, and how to render it for the debug
//! sink. It is built once by the process bootstrap, before any scheduler is
//! constructed, and shared between all execution groups.
//!
//! There is no self-registration through static initializers; the bootstrap
//! routine lists every type explicitly:
//!
//! ```rust
//! use lockstep::data::DataType;
//! use lockstep::type_registry::TypeRegistry;
//! use lockstep::types::DataKind;
//! use serde::Serialize;
//!
//! #[derive(Clone, Default, Serialize)]
//! struct BallState {
//!     found: bool,
//! }
//! impl DataType for BallState {
//!     const KIND: DataKind = DataKind::new("BallState");
//! }
//!
//! #[derive(Clone, Default, Serialize)]
//! struct MotionState {
//!     standing: bool,
//! }
//! impl DataType for MotionState {
//!     const KIND: DataKind = DataKind::new("MotionState");
//! }
//!
//! let registry = TypeRegistry::builder()
//!     .with::<BallState>()
//!     .with::<MotionState>()
//!     .build()
//!     .expect("kinds are unique");
//! assert!(registry.contains(BallState::KIND));
//! ```

use std::any::{self, Any};
use std::collections::hash_map::Entry;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::data::{BoxedValue, DataType};
use crate::types::DataKind;

/// Clones a type-erased slot value. Monomorphized per registered type.
pub(crate) type CloneValueFn = fn(&(dyn Any + Send + Sync)) -> BoxedValue;

type ToJsonFn = fn(&(dyn Any + Send + Sync)) -> Value;

fn make_default<T: DataType>() -> BoxedValue {
    Box::new(T::default())
}

fn clone_value<T: DataType>(value: &(dyn Any + Send + Sync)) -> BoxedValue {
    let value = value
        .downcast_ref::<T>()
        .expect("slot value matches its registered type");
    Box::new(value.clone())
}

fn to_json<T: DataType>(value: &(dyn Any + Send + Sync)) -> Value {
    let value = value
        .downcast_ref::<T>()
        .expect("slot value matches its registered type");
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Everything a store needs to manage one kind of slot without knowing its
/// concrete type.
#[derive(Debug)]
pub struct SlotSpec {
    kind: DataKind,
    type_name: &'static str,
    make_default: fn() -> BoxedValue,
    clone_value: CloneValueFn,
    to_json: ToJsonFn,
}

impl SlotSpec {
    fn of<T: DataType>() -> Self {
        Self {
            kind: T::KIND,
            type_name: any::type_name::<T>(),
            make_default: make_default::<T>,
            clone_value: clone_value::<T>,
            to_json: to_json::<T>,
        }
    }

    /// The kind this spec describes.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// The Rust type registered for this kind (diagnostics only).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn instantiate(&self) -> BoxedValue {
        (self.make_default)()
    }

    pub(crate) fn clone_fn(&self) -> CloneValueFn {
        self.clone_value
    }

    pub(crate) fn render_json(&self, value: &(dyn Any + Send + Sync)) -> Value {
        (self.to_json)(value)
    }
}

/// Errors raised while assembling the [`TypeRegistry`].
#[derive(Debug, Error, Diagnostic)]
pub enum TypeRegistryError {
    /// Two different Rust types claimed the same kind name.
    #[error("data kind {kind} registered for two different types: {first} and {second}")]
    #[diagnostic(
        code(lockstep::type_registry::duplicate_kind),
        help("every data kind name must belong to exactly one Rust type")
    )]
    DuplicateKind {
        kind: DataKind,
        first: &'static str,
        second: &'static str,
    },
}

/// The process-wide kind catalogue. Cheap to share via `Arc`; immutable after
/// [`build`](TypeRegistryBuilder::build).
#[derive(Debug)]
pub struct TypeRegistry {
    specs: FxHashMap<DataKind, SlotSpec>,
}

impl TypeRegistry {
    /// Starts an empty catalogue.
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder { specs: Vec::new() }
    }

    /// Looks up the spec for a kind.
    #[must_use]
    pub fn spec(&self, kind: DataKind) -> Option<&SlotSpec> {
        self.specs.get(&kind)
    }

    /// Whether the kind is known to this catalogue.
    #[must_use]
    pub fn contains(&self, kind: DataKind) -> bool {
        self.specs.contains_key(&kind)
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no kinds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterates over all registered kinds.
    pub fn kinds(&self) -> impl Iterator<Item = DataKind> + '_ {
        self.specs.keys().copied()
    }
}

/// Collects type registrations for a [`TypeRegistry`].
pub struct TypeRegistryBuilder {
    specs: Vec<SlotSpec>,
}

impl TypeRegistryBuilder {
    /// Adds a data type (fluent form).
    #[must_use]
    pub fn with<T: DataType>(mut self) -> Self {
        self.specs.push(SlotSpec::of::<T>());
        self
    }

    /// Adds a data type (mutating form, for loop-driven bootstraps).
    pub fn register<T: DataType>(&mut self) -> &mut Self {
        self.specs.push(SlotSpec::of::<T>());
        self
    }

    /// Finalizes the catalogue.
    ///
    /// Registering the same type twice is idempotent; the same kind name on
    /// two different types is a fatal bootstrap error.
    pub fn build(self) -> Result<TypeRegistry, TypeRegistryError> {
        let mut specs: FxHashMap<DataKind, SlotSpec> = FxHashMap::default();
        for spec in self.specs {
            match specs.entry(spec.kind()) {
                Entry::Occupied(existing) => {
                    if existing.get().type_name() != spec.type_name() {
                        return Err(TypeRegistryError::DuplicateKind {
                            kind: spec.kind(),
                            first: existing.get().type_name(),
                            second: spec.type_name(),
                        });
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(spec);
                }
            }
        }
        Ok(TypeRegistry { specs })
    }
}
