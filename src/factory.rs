//! Registry of constructible module types.
//!
//! The registry is the explicit replacement for static self-registration: the
//! process bootstrap lists, per execution group, every module type that may
//! run, before any scheduler is constructed. A scheduler then instantiates
//! only the registered modules its configuration enables.
//!
//! Registration order matters: it is the discovery order used as the
//! tie-break of dependency resolution, so a fixed bootstrap yields the same
//! execution order on every run.

use rustc_hash::FxHashMap;

use crate::module::{Module, ModuleContext, ModuleDef};
use crate::scheduler::SetupError;
use crate::types::GroupKind;

type Constructor =
    Box<dyn Fn(&mut ModuleContext<'_>) -> Result<Box<dyn Module>, SetupError> + Send + Sync>;

/// One registered module type: a configuration name plus its constructor.
pub struct ModuleFactory {
    name: String,
    construct: Constructor,
}

impl ModuleFactory {
    /// Wraps an explicit constructor function.
    ///
    /// Prefer [`ModuleFactory::of`] for types implementing [`ModuleDef`];
    /// the closure form exists for hosts that need to capture state (test
    /// probes, simulator shims).
    pub fn new<F>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn(&mut ModuleContext<'_>) -> Result<Box<dyn Module>, SetupError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            construct: Box::new(construct),
        }
    }

    /// Factory for a [`ModuleDef`] type.
    #[must_use]
    pub fn of<M: ModuleDef>() -> Self {
        Self::new(M::NAME, |ctx| {
            Ok(Box::new(M::construct(ctx)?) as Box<dyn Module>)
        })
    }

    /// The module's configuration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn construct(
        &self,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<Box<dyn Module>, SetupError> {
        (self.construct)(ctx)
    }
}

/// Table of constructible module types per execution group.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: FxHashMap<GroupKind, Vec<ModuleFactory>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a [`ModuleDef`] type for a group.
    pub fn register<M: ModuleDef>(&mut self, group: GroupKind) -> &mut Self {
        self.register_factory(group, ModuleFactory::of::<M>())
    }

    /// Registers an explicit factory for a group.
    ///
    /// A second factory with a name already present in the group is ignored
    /// with a warning; the first registration wins.
    pub fn register_factory(&mut self, group: GroupKind, factory: ModuleFactory) -> &mut Self {
        let entries = self.factories.entry(group).or_default();
        if entries.iter().any(|existing| existing.name() == factory.name()) {
            tracing::warn!(
                group = %group,
                module = factory.name(),
                "ignoring duplicate module registration"
            );
            return self;
        }
        entries.push(factory);
        self
    }

    /// Fluent form of [`register`](Self::register).
    #[must_use]
    pub fn with_module<M: ModuleDef>(mut self, group: GroupKind) -> Self {
        self.register::<M>(group);
        self
    }

    /// Fluent form of [`register_factory`](Self::register_factory).
    #[must_use]
    pub fn with_factory(mut self, group: GroupKind, factory: ModuleFactory) -> Self {
        self.register_factory(group, factory);
        self
    }

    /// The factories registered for a group, in registration order.
    #[must_use]
    pub fn factories(&self, group: GroupKind) -> &[ModuleFactory] {
        self.factories.get(&group).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleError;

    const BRAIN: GroupKind = GroupKind::new("brain");

    struct Idle;
    impl Module for Idle {
        fn cycle(&mut self) -> Result<(), ModuleError> {
            Ok(())
        }
    }
    impl ModuleDef for Idle {
        const NAME: &'static str = "Idle";
        fn construct(_ctx: &mut ModuleContext<'_>) -> Result<Self, SetupError> {
            Ok(Self)
        }
    }

    #[test]
    fn registration_order_is_preserved() {
        let registry = ModuleRegistry::new()
            .with_factory(BRAIN, ModuleFactory::new("First", |_| Ok(Box::new(Idle) as Box<dyn Module>)))
            .with_factory(BRAIN, ModuleFactory::new("Second", |_| Ok(Box::new(Idle) as Box<dyn Module>)))
            .with_module::<Idle>(BRAIN);

        let names: Vec<&str> = registry
            .factories(BRAIN)
            .iter()
            .map(ModuleFactory::name)
            .collect();
        assert_eq!(names, ["First", "Second", "Idle"]);
    }

    #[test]
    fn duplicate_names_keep_the_first_registration() {
        let registry = ModuleRegistry::new()
            .with_module::<Idle>(BRAIN)
            .with_module::<Idle>(BRAIN);
        assert_eq!(registry.factories(BRAIN).len(), 1);
    }

    #[test]
    fn unknown_groups_have_no_factories() {
        let registry = ModuleRegistry::new();
        assert!(registry.factories(GroupKind::new("motion")).is_empty());
    }
}
