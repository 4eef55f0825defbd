//! Shared fixtures and helpers for lifecycle BDD scenarios.

use std::future::Future;

use flexsnap::test_support::{FakeOntap, StaticSecretSource};
use flexsnap::{ManagementEndpoint, OntapError, OntapManager};
use rstest::fixture;
use tokio::runtime::{Builder, Runtime};

use super::bdd_steps::StepError;

pub type Manager = OntapManager<StaticSecretSource, FakeOntap>;

#[derive(Clone, Debug)]
pub enum LifecycleOutcome {
    Returned(String),
    Completed,
    Failed(OntapError),
}

#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub fake: FakeOntap,
    pub source: StaticSecretSource,
    pub outcome: Option<LifecycleOutcome>,
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    LifecycleContext {
        fake: FakeOntap::new(),
        source: StaticSecretSource::new("hunter2"),
        outcome: None,
    }
}

impl LifecycleContext {
    pub fn manager(&self) -> Manager {
        let endpoint = ManagementEndpoint::new("10.0.0.1", "vsadmin", "fsx-admin", "us-east-1")
            .unwrap_or_else(|err| panic!("endpoint should be valid: {err}"));
        OntapManager::new(endpoint, self.source.clone(), self.fake.clone())
    }

    pub fn outcome(&self) -> Result<&LifecycleOutcome, StepError> {
        self.outcome
            .as_ref()
            .ok_or_else(|| StepError::Assertion(String::from("missing outcome")))
    }
}

/// Runs `future` on a paused clock so settle pauses complete instantly.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, StepError> {
    let runtime: Runtime = Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    Ok(runtime.block_on(future))
}
