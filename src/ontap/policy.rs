//! Settle and verification policies applied by the lifecycle operations.

use std::time::Duration;

/// Shortest pause between two settle checks, whatever the policy says.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bounded poll used after a mutating call.
///
/// The first check runs after `initial_delay`; each later pause doubles up
/// to `max_interval`. Polling stops as soon as the expected state is
/// observed, or once `max_wait` has elapsed since the mutation. No pause is
/// shorter than [`MIN_POLL_INTERVAL`], so a zero delay cannot spin.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SettlePolicy {
    /// Pause before the first check.
    pub initial_delay: Duration,
    /// Upper bound for a single pause.
    pub max_interval: Duration,
    /// Total settle budget.
    pub max_wait: Duration,
}

impl SettlePolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(initial_delay: Duration, max_interval: Duration, max_wait: Duration) -> Self {
        Self {
            initial_delay,
            max_interval,
            max_wait,
        }
    }

    /// Pause before the first check.
    #[must_use]
    pub fn first_interval(&self) -> Duration {
        self.initial_delay.max(MIN_POLL_INTERVAL)
    }

    /// Returns the pause that follows `current`.
    #[must_use]
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .min(self.max_interval)
            .max(MIN_POLL_INTERVAL)
    }
}

/// Policy knobs for the lifecycle manager.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LifecyclePolicy {
    /// Settle policy after creating a snapshot.
    pub snapshot_settle: SettlePolicy,
    /// Settle policy after creating a clone.
    pub clone_settle: SettlePolicy,
    /// Settle policy after deleting a volume or snapshot.
    pub delete_settle: SettlePolicy,
    /// Fail snapshot creation when the existence precheck itself fails,
    /// instead of logging a warning and attempting creation.
    pub strict_precheck: bool,
    /// Fail a deletion when the resource is still listed after the settle
    /// budget, instead of logging a warning.
    pub strict_delete_verification: bool,
}

const POLL_INITIAL: Duration = Duration::from_millis(500);
const POLL_MAX_INTERVAL: Duration = Duration::from_secs(2);

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            snapshot_settle: SettlePolicy::new(
                POLL_INITIAL,
                POLL_MAX_INTERVAL,
                Duration::from_secs(5),
            ),
            clone_settle: SettlePolicy::new(
                POLL_INITIAL,
                POLL_MAX_INTERVAL,
                Duration::from_secs(10),
            ),
            delete_settle: SettlePolicy::new(
                POLL_INITIAL,
                POLL_MAX_INTERVAL,
                Duration::from_secs(5),
            ),
            strict_precheck: false,
            strict_delete_verification: false,
        }
    }
}
