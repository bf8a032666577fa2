//! The contract for data exchanged between modules.
//!
//! Every value that flows through a [`DataStore`](crate::store::DataStore)
//! implements [`DataType`]. The trait ties a Rust type to its [`DataKind`]
//! identifier and fixes the lifecycle the scheduler relies on: a defined
//! default before the first production, cloneability for cross-group
//! snapshots, and serialization for the debug sink.
//!
//! # Examples
//!
//! ```rust
//! use lockstep::data::DataType;
//! use lockstep::types::DataKind;
//! use serde::Serialize;
//!
//! #[derive(Clone, Default, Serialize)]
//! struct BallState {
//!     found: bool,
//!     position: [f32; 2],
//! }
//!
//! impl DataType for BallState {
//!     const KIND: DataKind = DataKind::new("BallState");
//! }
//! ```

use std::any::Any;

use serde::Serialize;

use crate::types::DataKind;

/// Type-erased slot payload. Downcasts are confined to the store and the
/// registry's per-type helper functions; all other code goes through typed
/// handles.
pub(crate) type BoxedValue = Box<dyn Any + Send + Sync>;

/// A kind of data that modules publish and consume.
///
/// Implementations are plain data structs. The bounds encode the lifecycle
/// contract rather than behavior:
///
/// - `Default` is the defined state a consumer observes before the producing
///   module has run for the first time (and the state [`reset`](Self::reset)
///   restores);
/// - `Clone` lets the cross-group bridge copy a consistent snapshot between
///   stores running on different cadences;
/// - `Serialize` feeds the best-effort debug sink.
///
/// `KIND` must be unique per type across the whole process; the
/// [`TypeRegistry`](crate::type_registry::TypeRegistry) verifies this at
/// bootstrap.
pub trait DataType: Clone + Default + Serialize + Send + Sync + 'static {
    /// The process-wide identifier for this kind of data.
    const KIND: DataKind;

    /// Restores the defined default state.
    ///
    /// Producing modules that cannot compute a valid output this cycle are
    /// expected to publish a reset value rather than stale data.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, Serialize, PartialEq, Debug)]
    struct HeadAngles {
        yaw: f32,
        pitch: f32,
    }

    impl DataType for HeadAngles {
        const KIND: DataKind = DataKind::new("HeadAngles");
    }

    #[test]
    fn reset_restores_the_default() {
        let mut angles = HeadAngles {
            yaw: 1.2,
            pitch: -0.4,
        };
        angles.reset();
        assert_eq!(angles, HeadAngles::default());
    }
}
