//! Post-mutation settle loop and end-state verification.

use tokio::time::Instant;
use tracing::{debug, warn};

use super::Session;
use crate::ontap::error::{OntapError, Presence, Resource};
use crate::ontap::policy::SettlePolicy;
use crate::ontap::types::VolumeUuid;
use crate::resource::VolumeRef;
use crate::transport::Transport;

/// Resource whose presence a settle loop observes.
pub(super) enum Watch<'r> {
    Volume(&'r VolumeRef),
    Snapshot {
        volume: VolumeUuid,
        label: &'r str,
        name: &'r str,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Settled {
    Observed,
    TimedOut,
}

impl<T: Transport> Session<'_, T> {
    async fn observe(&self, target: &Watch<'_>) -> Result<bool, OntapError> {
        match *target {
            Watch::Volume(volume) => self.volume_exists(volume).await,
            Watch::Snapshot {
                volume,
                label,
                name,
            } => self.snapshot_exists(volume, label, name).await,
        }
    }

    /// Polls `target` until it reaches `expected` or `policy.max_wait`
    /// elapses. At least one check always runs.
    pub(super) async fn settle(
        &self,
        policy: &SettlePolicy,
        target: &Watch<'_>,
        expected: Presence,
    ) -> Result<Settled, OntapError> {
        let deadline = Instant::now() + policy.max_wait;
        let mut interval = policy.first_interval();
        let want_present = expected == Presence::Present;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            self.pause(interval.min(remaining)).await?;
            if self.observe(target).await? == want_present {
                return Ok(Settled::Observed);
            }
            if Instant::now() >= deadline {
                return Ok(Settled::TimedOut);
            }
            debug!(operation = self.operation, ?interval, "resource not settled yet");
            interval = policy.next_interval(interval);
        }
    }

    pub(super) async fn confirm_present(
        &self,
        policy: &SettlePolicy,
        target: &Watch<'_>,
        resource: Resource,
    ) -> Result<(), OntapError> {
        match self.settle(policy, target, Presence::Present).await? {
            Settled::Observed => Ok(()),
            Settled::TimedOut => Err(OntapError::VerificationFailed {
                resource,
                expected: Presence::Present,
                waited: policy.max_wait,
            }),
        }
    }

    /// Waits for a deleted resource to drop out of listings. Without strict
    /// verification a lingering resource or a failed check only warns.
    pub(super) async fn confirm_absent(
        &self,
        target: &Watch<'_>,
        resource: Resource,
    ) -> Result<(), OntapError> {
        let policy = self.policy.delete_settle;
        let strict = self.policy.strict_delete_verification;
        match self.settle(&policy, target, Presence::Absent).await {
            Ok(Settled::Observed) => Ok(()),
            Ok(Settled::TimedOut) if strict => Err(OntapError::VerificationFailed {
                resource,
                expected: Presence::Absent,
                waited: policy.max_wait,
            }),
            Ok(Settled::TimedOut) => {
                warn!(
                    %resource,
                    waited = ?policy.max_wait,
                    "delete accepted but resource is still listed"
                );
                Ok(())
            }
            Err(err @ OntapError::Cancelled { .. }) => Err(err),
            Err(err) if strict => Err(err),
            Err(err) => {
                warn!(%resource, error = %err, "could not verify deletion");
                Ok(())
            }
        }
    }
}
