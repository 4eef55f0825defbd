//! BDD scenarios for the lifecycle manager.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Create a snapshot that does not exist yet"
)]
fn scenario_create_snapshot(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Creating an existing snapshot changes nothing"
)]
fn scenario_existing_snapshot(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Clone a volume from a snapshot"
)]
fn scenario_create_clone(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Refuse to clone onto an existing volume"
)]
fn scenario_existing_clone_target(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Deleting an unknown volume reports it missing"
)]
fn scenario_delete_unknown_volume(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "A deleted clone is reported absent"
)]
fn scenario_deleted_clone_absent(lifecycle_context: LifecycleContext) {
    let _ = lifecycle_context;
}
