use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::core::{CheckDescriptor, Outcome};
use crate::engine::{MessageSink, RunContext};
use crate::environment::Environment;

/// A single audit check. Implementations must be pure with respect to
/// the environment snapshot and report everything through the returned
/// outcome and the message sink.
pub trait Check: Send + Sync {
    fn descriptor(&self) -> &CheckDescriptor;

    fn perform(
        &self,
        ctx: &RunContext,
        env: &Environment,
        messages: &mut MessageSink,
    ) -> Result<Outcome>;
}

/// Selection criteria for listing or running checks.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub category: Option<String>,
    pub enabled_only: bool,
}

impl ListFilter {
    pub fn enabled() -> Self {
        Self {
            category: None,
            enabled_only: true,
        }
    }

    pub fn in_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            enabled_only: false,
        }
    }

    fn matches(&self, descriptor: &CheckDescriptor) -> bool {
        if self.enabled_only && !descriptor.enabled {
            return false;
        }
        match &self.category {
            Some(category) => descriptor.category == *category,
            None => true,
        }
    }
}

/// Id-keyed collection of checks. Iteration order is the registration
/// order, which is the order checks run in.
#[derive(Default)]
pub struct CheckRegistry {
    order: Vec<String>,
    checks: BTreeMap<String, Box<dyn Check>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Box<dyn Check>) -> Result<()> {
        let id = check.descriptor().id.clone();
        if self.checks.contains_key(&id) {
            bail!("duplicate check id: {id}");
        }
        self.order.push(id.clone());
        self.checks.insert(id, check);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&dyn Check> {
        self.checks.get(id).map(Box::as_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.checks.contains_key(id)
    }

    pub fn list(&self, filter: &ListFilter) -> Vec<&CheckDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.checks.get(id))
            .map(|check| check.descriptor())
            .filter(|descriptor| filter.matches(descriptor))
            .collect()
    }

    pub fn ids(&self, filter: &ListFilter) -> Vec<String> {
        self.list(filter)
            .into_iter()
            .map(|descriptor| descriptor.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;

    struct NoopCheck {
        descriptor: CheckDescriptor,
    }

    impl NoopCheck {
        fn boxed(descriptor: CheckDescriptor) -> Box<dyn Check> {
            Box::new(Self { descriptor })
        }
    }

    impl Check for NoopCheck {
        fn descriptor(&self) -> &CheckDescriptor {
            &self.descriptor
        }

        fn perform(
            &self,
            _ctx: &RunContext,
            _env: &Environment,
            _messages: &mut MessageSink,
        ) -> Result<Outcome> {
            Ok(Outcome::pass())
        }
    }

    fn registry() -> CheckRegistry {
        let mut registry = CheckRegistry::new();
        registry
            .register(NoopCheck::boxed(CheckDescriptor::new(
                "b-second",
                "Second",
                "security",
                Severity::High,
            )))
            .expect("register");
        registry
            .register(NoopCheck::boxed(CheckDescriptor::new(
                "a-first",
                "First",
                "core",
                Severity::Normal,
            )))
            .expect("register");
        registry
            .register(NoopCheck::boxed(
                CheckDescriptor::new("c-off", "Disabled", "core", Severity::Low).disabled(),
            ))
            .expect("register");
        registry
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = registry();
        let err = registry
            .register(NoopCheck::boxed(CheckDescriptor::new(
                "a-first",
                "Again",
                "core",
                Severity::Low,
            )))
            .unwrap_err();
        assert!(err.to_string().contains("a-first"));
    }

    #[test]
    fn list_keeps_registration_order() {
        let ids = registry().ids(&ListFilter::default());
        assert_eq!(ids, vec!["b-second", "a-first", "c-off"]);
    }

    #[test]
    fn enabled_filter_drops_disabled_checks() {
        let ids = registry().ids(&ListFilter::enabled());
        assert_eq!(ids, vec!["b-second", "a-first"]);
    }

    #[test]
    fn category_filter_selects_one_category() {
        let ids = registry().ids(&ListFilter::in_category("core"));
        assert_eq!(ids, vec!["a-first", "c-off"]);
    }
}
