//! Scenario definitions.
//!
//! A scenario is an ordered list of named steps run against one fresh
//! catalog. Each step performs one store call and carries the assertion its
//! result must satisfy.

use strata_store::{StoreConfig, StoreResult};

use crate::assertion::{AssertionBuilder, StepOutcome};
use crate::error::ScenarioResult;
use crate::fixture::Catalog;
use crate::Assertion;

type Action = Box<dyn Fn(&Catalog) -> StoreResult<StepOutcome>>;

/// One named store call and its expectation.
pub struct Step {
    pub name: String,
    pub action: Action,
    pub assertion: Assertion,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("assertion", &self.assertion)
            .finish()
    }
}

/// A named sequence of steps.
#[derive(Debug)]
pub struct Scenario {
    name: String,
    config: StoreConfig,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: StoreConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Run against a store built with `config`.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a step. The action's result is converted into a [`StepOutcome`].
    pub fn step<A, T, F>(mut self, name: impl Into<String>, action: A, assert: F) -> Self
    where
        A: Fn(&Catalog) -> StoreResult<T> + 'static,
        T: Into<StepOutcome>,
        F: FnOnce(AssertionBuilder) -> AssertionBuilder,
    {
        self.steps.push(Step {
            name: name.into(),
            action: Box::new(move |catalog| action(catalog).map(Into::into)),
            assertion: assert(AssertionBuilder::new()).build(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step on a fresh catalog, stopping at the first failed
    /// assertion. Returns the catalog for follow-up checks.
    pub fn run(&self) -> ScenarioResult<Catalog> {
        let catalog = Catalog::with_config(self.config.clone())?;
        tracing::debug!(scenario = %self.name, steps = self.steps.len(), "running scenario");

        for step in &self.steps {
            catalog.reset_recordings();
            let result = (step.action)(&catalog);
            step.assertion.verify(&step.name, &catalog, &result)?;
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{table, STEWARD};

    #[test]
    fn test_steps_keep_their_order() {
        // GIVEN
        let scenario = Scenario::new("order")
            .step("create", |c| c.create(STEWARD, vec![table("db.t1")]), |a| a.created(1))
            .step("again", |c| c.create(STEWARD, vec![table("db.t1")]), |a| a.unchanged());

        // THEN
        let names: Vec<&str> = scenario.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["create", "again"]);
    }

    #[test]
    fn test_failed_assertion_names_the_step() {
        // GIVEN
        let scenario = Scenario::new("wrong")
            .step("create", |c| c.create(STEWARD, vec![table("db.t1")]), |a| a.created(2));

        // WHEN
        let err = match scenario.run() {
            Ok(_) => panic!("scenario should fail"),
            Err(err) => err,
        };

        // THEN
        assert!(err.to_string().contains("step 'create'"));
        assert!(err.to_string().contains("expected 2 created, got 1"));
    }
}
