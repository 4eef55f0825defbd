//! BDD step definitions for lifecycle behaviour.

use flexsnap::{CloneSpec, Method, OntapError, Resource, VolumeRef};
use rstest_bdd_macros::{given, then, when};
use tokio_util::sync::CancellationToken;

use super::test_helpers::{LifecycleContext, LifecycleOutcome, block_on};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn record(result: Result<String, OntapError>) -> LifecycleOutcome {
    match result {
        Ok(name) => LifecycleOutcome::Returned(name),
        Err(err) => LifecycleOutcome::Failed(err),
    }
}

#[given("volume \"{name}\" exists in SVM \"{svm}\"")]
fn volume_exists(
    lifecycle_context: LifecycleContext,
    name: String,
    svm: String,
) -> LifecycleContext {
    lifecycle_context.fake.add_volume(&name, &svm);
    lifecycle_context
}

#[given("snapshot \"{snapshot}\" exists on volume \"{volume}\"")]
fn snapshot_exists(
    lifecycle_context: LifecycleContext,
    snapshot: String,
    volume: String,
) -> LifecycleContext {
    let Some(uuid) = lifecycle_context.fake.volume_uuid(&volume) else {
        panic!("test setup requires volume {volume}");
    };
    lifecycle_context.fake.add_snapshot(uuid, &snapshot);
    lifecycle_context
}

#[given("no volumes exist")]
fn no_volumes(lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context
}

#[given("listings trail every change by one read")]
fn listings_trail(lifecycle_context: LifecycleContext) -> LifecycleContext {
    lifecycle_context.fake.set_visibility_delay(1);
    lifecycle_context.fake.set_sticky_deletes(1);
    lifecycle_context
}

#[when("I create snapshot \"{snapshot}\" on volume \"{volume}\"")]
fn create_snapshot(
    mut lifecycle_context: LifecycleContext,
    snapshot: String,
    volume: String,
) -> Result<LifecycleContext, StepError> {
    let manager = lifecycle_context.manager();
    let cancel = CancellationToken::new();
    let result = block_on(async move {
        manager
            .create_snapshot(&VolumeRef::new(volume), &snapshot, &cancel)
            .await
    })?;
    lifecycle_context.outcome = Some(record(result));
    Ok(lifecycle_context)
}

#[when("I clone \"{clone}\" from snapshot \"{snapshot}\" of volume \"{volume}\" in SVM \"{svm}\"")]
fn create_clone(
    mut lifecycle_context: LifecycleContext,
    clone: String,
    snapshot: String,
    volume: String,
    svm: String,
) -> Result<LifecycleContext, StepError> {
    let spec = CloneSpec::builder()
        .source_volume(volume)
        .source_snapshot(snapshot)
        .clone_volume(clone)
        .svm(svm)
        .build()
        .map_err(|err| StepError::Assertion(err.to_string()))?;
    let manager = lifecycle_context.manager();
    let cancel = CancellationToken::new();
    let result = block_on(async move { manager.create_clone(&spec, &cancel).await })?;
    lifecycle_context.outcome = Some(record(result));
    Ok(lifecycle_context)
}

#[when("I delete volume \"{volume}\"")]
fn delete_volume(
    mut lifecycle_context: LifecycleContext,
    volume: String,
) -> Result<LifecycleContext, StepError> {
    let manager = lifecycle_context.manager();
    let cancel = CancellationToken::new();
    let result = block_on(async move {
        manager
            .delete_volume(&VolumeRef::new(volume), &cancel)
            .await
    })?;
    lifecycle_context.outcome = Some(match result {
        Ok(()) => LifecycleOutcome::Completed,
        Err(err) => LifecycleOutcome::Failed(err),
    });
    Ok(lifecycle_context)
}

#[then("the operation returns \"{name}\"")]
fn returns_name(lifecycle_context: &LifecycleContext, name: String) -> Result<(), StepError> {
    match lifecycle_context.outcome()? {
        LifecycleOutcome::Returned(returned) if *returned == name => Ok(()),
        other => Err(StepError::Assertion(format!("expected {name}, got: {other:?}"))),
    }
}

#[then("the operation completes")]
fn completes(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.outcome()? {
        LifecycleOutcome::Completed => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected completion, got: {other:?}"
        ))),
    }
}

#[then("the operation fails because volume \"{name}\" already exists")]
fn fails_already_exists(
    lifecycle_context: &LifecycleContext,
    name: String,
) -> Result<(), StepError> {
    match lifecycle_context.outcome()? {
        LifecycleOutcome::Failed(OntapError::AlreadyExists {
            resource: Resource::Volume { name: found, .. },
        }) if *found == name => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {name} to already exist, got: {other:?}"
        ))),
    }
}

#[then("the operation fails because volume \"{name}\" was not found")]
fn fails_not_found(lifecycle_context: &LifecycleContext, name: String) -> Result<(), StepError> {
    let expected = OntapError::NotFound {
        resource: Resource::from(&VolumeRef::new(name)),
    };
    match lifecycle_context.outcome()? {
        LifecycleOutcome::Failed(err) if *err == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {expected}, got: {other:?}"
        ))),
    }
}

fn expect_count(
    lifecycle_context: &LifecycleContext,
    method: Method,
    expected: usize,
) -> Result<(), StepError> {
    let issued = lifecycle_context.fake.count(method, "");
    if issued == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected} {method:?} requests, got {issued}"
        )))
    }
}

#[then("exactly one create request was issued")]
fn one_create(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    expect_count(lifecycle_context, Method::Post, 1)
}

#[then("no create request was issued")]
fn no_create(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    expect_count(lifecycle_context, Method::Post, 0)
}

#[then("no delete request was issued")]
fn no_delete(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    expect_count(lifecycle_context, Method::Delete, 0)
}

#[then("snapshot \"{snapshot}\" is listed on volume \"{volume}\"")]
fn snapshot_listed(
    lifecycle_context: &LifecycleContext,
    snapshot: String,
    volume: String,
) -> Result<(), StepError> {
    let Some(uuid) = lifecycle_context.fake.volume_uuid(&volume) else {
        return Err(StepError::Assertion(format!("volume {volume} is gone")));
    };
    if lifecycle_context.fake.has_snapshot(uuid, &snapshot) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "snapshot {snapshot} missing on {volume}"
        )))
    }
}

fn reported_presence(
    lifecycle_context: &LifecycleContext,
    name: String,
    svm: String,
) -> Result<bool, StepError> {
    let manager = lifecycle_context.manager();
    let cancel = CancellationToken::new();
    let volume = VolumeRef::new(name).in_svm(Some(svm));
    block_on(async move { manager.volume_exists(&volume, &cancel).await })?
        .map_err(|err| StepError::Assertion(err.to_string()))
}

#[then("volume \"{name}\" is reported present in SVM \"{svm}\"")]
fn reported_present(
    lifecycle_context: &LifecycleContext,
    name: String,
    svm: String,
) -> Result<(), StepError> {
    if reported_presence(lifecycle_context, name.clone(), svm)? {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("volume {name} is not listed")))
    }
}

#[then("volume \"{name}\" is reported absent in SVM \"{svm}\"")]
fn reported_absent(
    lifecycle_context: &LifecycleContext,
    name: String,
    svm: String,
) -> Result<(), StepError> {
    if reported_presence(lifecycle_context, name.clone(), svm)? {
        Err(StepError::Assertion(format!("volume {name} is still listed")))
    } else {
        Ok(())
    }
}
