//! Module enablement configuration.
//!
//! For each execution group the host provides a [`ModuleSetup`]: a mapping
//! from module name to a boolean enablement flag. Every module *registered*
//! for a group must have an entry: a registered module missing from the map
//! is a fatal configuration error that names the module, so a typo in the
//! setup cannot silently drop a module from the schedule.
//!
//! The types derive `Serialize`/`Deserialize`, so a host can load them from
//! whatever format it already uses; parsing files is outside this crate.
//!
//! # Examples
//!
//! ```rust
//! use lockstep::config::{ModuleSetup, ScheduleConfig};
//! use lockstep::types::GroupKind;
//!
//! const BRAIN: GroupKind = GroupKind::new("brain");
//!
//! let config = ScheduleConfig::new().with_group(
//!     BRAIN,
//!     ModuleSetup::new()
//!         .with("BallFilter", true)
//!         .with("TeamObstacleFilter", false),
//! );
//!
//! let setup = config.group(BRAIN).unwrap();
//! assert!(setup.require("BallFilter", BRAIN).unwrap());
//! assert!(!setup.require("TeamObstacleFilter", BRAIN).unwrap());
//! assert!(setup.require("WhistleDetector", BRAIN).is_err());
//! ```

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::GroupKind;

/// Configuration errors. All fatal: the process must not start, the
/// configuration must be corrected and the process restarted.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// No module setup exists for the group a scheduler was asked to run.
    #[error("no module setup configured for group {group}")]
    #[diagnostic(
        code(lockstep::config::unknown_group),
        help("add a ModuleSetup for this group to the ScheduleConfig")
    )]
    UnknownGroup { group: GroupKind },

    /// A registered module has no entry in its group's enablement map.
    #[error("module {module} not found in the active module setup of group {group}")]
    #[diagnostic(
        code(lockstep::config::module_not_listed),
        help("add an enablement entry for this module; have you forgotten to list it?")
    )]
    ModuleNotListed { module: String, group: GroupKind },
}

/// Enablement map of one execution group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleSetup {
    modules: FxHashMap<String, bool>,
}

impl ModuleSetup {
    /// Creates an empty setup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one module's enablement flag (fluent form).
    #[must_use]
    pub fn with(mut self, module: impl Into<String>, enabled: bool) -> Self {
        self.modules.insert(module.into(), enabled);
        self
    }

    /// Sets one module's enablement flag.
    pub fn set(&mut self, module: impl Into<String>, enabled: bool) -> &mut Self {
        self.modules.insert(module.into(), enabled);
        self
    }

    /// The flag for a module, or `None` if it is not listed.
    #[must_use]
    pub fn enabled(&self, module: &str) -> Option<bool> {
        self.modules.get(module).copied()
    }

    /// The flag for a module that *must* be listed.
    ///
    /// A missing entry is the fatal configuration error of the setup
    /// algorithm; the error names the offending module.
    pub fn require(&self, module: &str, group: GroupKind) -> Result<bool, ConfigError> {
        self.enabled(module).ok_or_else(|| ConfigError::ModuleNotListed {
            module: module.to_string(),
            group,
        })
    }
}

/// Per-group module setups for a whole robot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleConfig {
    groups: FxHashMap<String, ModuleSetup>,
}

impl ScheduleConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group's setup (fluent form).
    #[must_use]
    pub fn with_group(mut self, group: GroupKind, setup: ModuleSetup) -> Self {
        self.groups.insert(group.as_str().to_string(), setup);
        self
    }

    /// Adds a group's setup.
    pub fn insert_group(&mut self, group: GroupKind, setup: ModuleSetup) -> &mut Self {
        self.groups.insert(group.as_str().to_string(), setup);
        self
    }

    /// The setup for one group; a missing group is a fatal error.
    pub fn group(&self, group: GroupKind) -> Result<&ModuleSetup, ConfigError> {
        self.groups
            .get(group.as_str())
            .ok_or(ConfigError::UnknownGroup { group })
    }
}
