//! Settle loop timing, verification and cancellation.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{SVM, assert_elapsed, session};
use crate::ontap::lifecycle::wait::{Watch, Settled};
use crate::ontap::{LifecyclePolicy, OntapError, Presence, Resource, SettlePolicy};
use crate::resource::VolumeRef;
use crate::test_support::{FakeFailure, FakeOntap};
use crate::transport::Method;

#[tokio::test(start_paused = true)]
async fn settle_returns_after_first_check_when_already_observed() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    let cancel = CancellationToken::new();
    let policy = LifecyclePolicy::default();
    let session = session(&fake, &cancel, policy);
    let volume = VolumeRef::new("vol1");
    let started = Instant::now();

    let settled = session
        .settle(&policy.clone_settle, &Watch::Volume(&volume), Presence::Present)
        .await
        .expect("settle should succeed");

    assert_eq!(settled, Settled::Observed);
    assert_elapsed(started, policy.clone_settle.initial_delay);
    assert_eq!(fake.count(Method::Get, "/storage/volumes"), 1);
}

#[tokio::test(start_paused = true)]
async fn snapshot_creation_backs_off_until_visible() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    fake.set_visibility_delay(2);
    let cancel = CancellationToken::new();
    let session = session(&fake, &cancel, LifecyclePolicy::default());
    let started = Instant::now();

    let name = session
        .create_snapshot(&VolumeRef::new("vol1"), "snap1")
        .await
        .expect("snapshot should settle");

    assert_eq!(name, "snap1");
    // One precheck plus three settle polls at 0.5 s, 1.5 s and 3.5 s.
    assert_eq!(fake.count(Method::Get, "/snapshots"), 4);
    assert_elapsed(started, Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn swallowed_create_fails_verification_after_budget() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    fake.set_swallow_creates(true);
    let cancel = CancellationToken::new();
    let policy = LifecyclePolicy::default();
    let session = session(&fake, &cancel, policy);
    let started = Instant::now();

    let err = session
        .create_snapshot(&VolumeRef::new("vol1"), "snap1")
        .await
        .expect_err("snapshot never appears");

    assert_eq!(
        err,
        OntapError::VerificationFailed {
            resource: Resource::snapshot("vol1", "snap1"),
            expected: Presence::Present,
            waited: policy.snapshot_settle.max_wait,
        }
    );
    assert_elapsed(started, policy.snapshot_settle.max_wait);
    // Polls at 0.5 s, 1.5 s, 3.5 s and the deadline, after one precheck.
    assert_eq!(fake.count(Method::Get, "/snapshots"), 5);
}

#[tokio::test(start_paused = true)]
async fn zero_delay_policy_polls_at_the_floor_interval() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    fake.set_swallow_creates(true);
    let cancel = CancellationToken::new();
    let zero = SettlePolicy::new(Duration::ZERO, Duration::ZERO, Duration::from_millis(200));
    let policy = LifecyclePolicy {
        snapshot_settle: zero,
        ..LifecyclePolicy::default()
    };
    let session = session(&fake, &cancel, policy);
    let started = Instant::now();

    let err = session
        .create_snapshot(&VolumeRef::new("vol1"), "snap1")
        .await
        .expect_err("snapshot never appears");

    assert!(
        matches!(err, OntapError::VerificationFailed { .. }),
        "unexpected error: {err:?}"
    );
    assert_elapsed(started, Duration::from_millis(200));
    // One precheck plus polls every 50 ms up to the deadline.
    assert_eq!(fake.count(Method::Get, "/snapshots"), 5);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_settle_stops_polling() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    fake.set_swallow_creates(true);
    let cancel = CancellationToken::new();
    let session = session(&fake, &cancel, LifecyclePolicy::default());

    let volume = VolumeRef::new("vol1");

    let (result, ()) = tokio::join!(session.create_snapshot(&volume, "snap1"), async {
        tokio::time::sleep(Duration::from_millis(800)).await;
        cancel.cancel();
    });

    let err = result.expect_err("cancelled operation should fail");
    assert_eq!(
        err,
        OntapError::Cancelled {
            operation: "test operation".to_owned(),
            resource: Resource::from(&volume),
        }
    );
    // Precheck and the first settle poll ran; nothing after cancellation.
    assert_eq!(fake.count(Method::Get, "/snapshots"), 2);
    assert_eq!(fake.count(Method::Post, "/snapshots"), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_in_flight_request() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    fake.set_latency(Duration::from_secs(10));
    let cancel = CancellationToken::new();
    let session = session(&fake, &cancel, LifecyclePolicy::default());
    let started = Instant::now();

    let volume = VolumeRef::new("vol1");

    let (result, ()) = tokio::join!(session.volume_exists(&volume), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    assert!(matches!(result, Err(OntapError::Cancelled { .. })));
    assert_elapsed(started, Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn lenient_delete_tolerates_verification_lookup_failure() {
    let fake = FakeOntap::new();
    let vol = fake.add_volume("vol1", SVM);
    fake.add_snapshot(vol, "snap1");
    // Let the lookup through, fail the post-delete listing.
    fake.fail_after(Method::Get, "/snapshots", 1, FakeFailure::Status(500));
    let cancel = CancellationToken::new();
    let session = session(&fake, &cancel, LifecyclePolicy::default());

    session
        .delete_snapshot(&VolumeRef::new("vol1"), "snap1")
        .await
        .expect("lenient delete should succeed");

    assert!(!fake.has_snapshot(vol, "snap1"));
}

#[tokio::test(start_paused = true)]
async fn strict_delete_surfaces_verification_lookup_failure() {
    let fake = FakeOntap::new();
    fake.add_volume("vol1", SVM);
    fake.fail_after(Method::Get, "/storage/volumes", 1, FakeFailure::Transport);
    let cancel = CancellationToken::new();
    let strict = LifecyclePolicy {
        strict_delete_verification: true,
        ..LifecyclePolicy::default()
    };
    let session = session(&fake, &cancel, strict);

    let err = session
        .delete_volume(&VolumeRef::new("vol1"))
        .await
        .expect_err("strict delete should surface the lookup failure");

    assert!(
        matches!(err, OntapError::Transport { .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(fake.volume_uuid("vol1"), None);
}
