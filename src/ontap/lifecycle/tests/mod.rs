//! Unit tests for lifecycle sessions, driven through [`FakeOntap`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Session;
use crate::ontap::{LifecyclePolicy, Resource};
use crate::resource::VolumeRef;
use crate::test_support::FakeOntap;

mod settle;

const SVM: &str = "svm0";

fn session<'c>(
    fake: &FakeOntap,
    cancel: &'c CancellationToken,
    policy: LifecyclePolicy,
) -> Session<'c, FakeOntap> {
    let target = Resource::from(&VolumeRef::new("vol1"));
    Session::new(fake.clone(), cancel, "test operation", target, policy)
}

/// Paused-clock sleeps land on millisecond ticks; allow for rounding.
fn assert_elapsed(started: Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(20),
        "elapsed {elapsed:?}, expected about {expected:?}"
    );
}
