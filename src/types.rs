//! Core identifier types for the lockstep control scheduler.
//!
//! This module defines the two identifiers everything else is keyed by:
//!
//! - [`DataKind`]: names one kind of data flowing between modules
//! - [`GroupKind`]: names one execution group (one scheduler + data store)
//!
//! Both are thin wrappers around `&'static str` so they can be declared as
//! `const` items next to the types and groups they identify. Identity is the
//! string itself: two `DataKind`s with the same name refer to the same slot,
//! which is why the [`TypeRegistry`](crate::type_registry::TypeRegistry)
//! rejects one name claimed by two different Rust types.
//!
//! # Examples
//!
//! ```rust
//! use lockstep::types::{DataKind, GroupKind};
//!
//! const BALL_STATE: DataKind = DataKind::new("BallState");
//! const BRAIN: GroupKind = GroupKind::new("brain");
//!
//! assert_eq!(BALL_STATE.as_str(), "BallState");
//! assert_eq!(format!("{BRAIN}"), "brain");
//! ```

use serde::Serialize;
use std::fmt;

/// Identifies one kind of data exchanged through a
/// [`DataStore`](crate::store::DataStore).
///
/// Every data type carries exactly one `DataKind`
/// (via [`DataType::KIND`](crate::data::DataType::KIND)); within one
/// execution group at most one module may produce a given kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DataKind(&'static str);

impl DataKind {
    /// Creates a kind identifier from its canonical name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Identifies one execution group.
///
/// A group is one scheduler with its own data store, module list and cadence;
/// a robot typically runs a few of them (for example a fast `"motion"` group
/// and a slower `"brain"` group) on independent tasks. Module factories are
/// registered against a `GroupKind`, and the cross-group bridge resolves
/// requests between groups by this identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKind(&'static str);

impl GroupKind {
    /// Creates a group identifier from its canonical name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_compare_by_name() {
        let a = DataKind::new("BallState");
        let b = DataKind::new("BallState");
        let c = DataKind::new("TeamBallModel");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_the_bare_name() {
        assert_eq!(DataKind::new("MotionState").to_string(), "MotionState");
        assert_eq!(GroupKind::new("motion").to_string(), "motion");
    }
}
