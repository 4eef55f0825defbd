//! Volume and snapshot lifecycle against the ONTAP management API.
//!
//! [`OntapManager`] owns the endpoint description, the memoised credential
//! and a [`Connector`] for building per-operation transports. Every public
//! operation validates its arguments before touching the network, accepts a
//! [`CancellationToken`], and fails with a typed [`OntapError`].
//!
//! Mutating operations follow a settle-then-verify pattern: after the API
//! accepts a create or delete, the manager polls the collection endpoint with
//! a bounded, doubling interval until the expected state is observed or the
//! budget in [`LifecyclePolicy`] runs out.

mod error;
mod lifecycle;
mod policy;
mod records;
mod types;

use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::{OntapError, Presence, Resource};
pub use policy::{LifecyclePolicy, MIN_POLL_INTERVAL, SettlePolicy};
pub use types::{SnapshotUuid, VolumeUuid};

use crate::credential::CredentialCache;
use crate::resource::{CloneSpec, ManagementEndpoint, VolumeRef, require_name};
use crate::secret::SecretSource;
use crate::transport::Connector;
use lifecycle::{Session, cancellable};

/// Lifecycle manager for ONTAP volumes, snapshots and FlexClones.
///
/// The manager is `Send + Sync` when its collaborators are and may be shared
/// behind an `Arc`; the only shared state is the credential cache.
#[derive(Debug)]
pub struct OntapManager<S, C> {
    endpoint: ManagementEndpoint,
    credentials: CredentialCache<S>,
    connector: C,
    policy: LifecyclePolicy,
}

impl<S, C> OntapManager<S, C>
where
    S: SecretSource,
    C: Connector,
{
    /// Creates a manager with the default [`LifecyclePolicy`].
    #[must_use]
    pub fn new(endpoint: ManagementEndpoint, source: S, connector: C) -> Self {
        let credentials = CredentialCache::new(
            source,
            endpoint.secret_name.clone(),
            endpoint.region.clone(),
        );
        Self {
            endpoint,
            credentials,
            connector,
            policy: LifecyclePolicy::default(),
        }
    }

    /// Replaces the lifecycle policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Endpoint this manager talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &ManagementEndpoint {
        &self.endpoint
    }

    /// Policy applied to mutating operations.
    #[must_use]
    pub const fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Resolves a volume name to its UUID.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::NotFound`] when no volume matches,
    /// [`OntapError::Ambiguous`] when several do, and transport or response
    /// errors otherwise.
    pub async fn resolve_volume_uuid(
        &self,
        volume: &VolumeRef,
        cancel: &CancellationToken,
    ) -> Result<VolumeUuid, OntapError> {
        volume.validate()?;
        let session = self
            .session(cancel, "volume lookup", Resource::from(volume))
            .await?;
        session.require_volume(volume).await
    }

    /// Resolves a snapshot name under `volume` to its UUID.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::NotFound`] for a snapshot-scoped miss,
    /// [`OntapError::QueryFailed`] when the parent volume no longer exists,
    /// and transport or response errors otherwise.
    pub async fn resolve_snapshot_uuid(
        &self,
        volume: VolumeUuid,
        snapshot: &str,
        cancel: &CancellationToken,
    ) -> Result<SnapshotUuid, OntapError> {
        let name = require_name("snapshot", snapshot)?;
        let label = volume.to_string();
        let session = self
            .session(cancel, "snapshot lookup", Resource::snapshot(&label, name))
            .await?;
        session
            .lookup_snapshot(volume, &label, name)
            .await?
            .ok_or_else(|| OntapError::NotFound {
                resource: Resource::snapshot(label, name),
            })
    }

    /// Reports whether at least one volume matches `volume`.
    ///
    /// # Errors
    ///
    /// Returns transport, status or response errors; absence is `Ok(false)`.
    pub async fn volume_exists(
        &self,
        volume: &VolumeRef,
        cancel: &CancellationToken,
    ) -> Result<bool, OntapError> {
        volume.validate()?;
        let session = self
            .session(cancel, "volume existence check", Resource::from(volume))
            .await?;
        session.volume_exists(volume).await
    }

    /// Reports whether a snapshot called `snapshot` exists under `volume`.
    ///
    /// # Errors
    ///
    /// Returns transport, status or response errors; absence is `Ok(false)`.
    pub async fn snapshot_exists(
        &self,
        volume: VolumeUuid,
        snapshot: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, OntapError> {
        let name = require_name("snapshot", snapshot)?;
        let label = volume.to_string();
        let target = Resource::snapshot(&label, name);
        let session = self
            .session(cancel, "snapshot existence check", target)
            .await?;
        session.snapshot_exists(volume, &label, name).await
    }

    /// Creates `snapshot` on `volume` unless it already exists.
    ///
    /// Returns the snapshot name on success, including when the snapshot was
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::NotFound`] for an unknown volume,
    /// [`OntapError::CreateFailed`] when the API rejects the request and
    /// [`OntapError::VerificationFailed`] when the snapshot never appears.
    pub async fn create_snapshot(
        &self,
        volume: &VolumeRef,
        snapshot: &str,
        cancel: &CancellationToken,
    ) -> Result<String, OntapError> {
        volume.validate()?;
        let name = require_name("snapshot", snapshot)?;
        info!(volume = %volume.name, snapshot = name, "creating snapshot");
        let target = Resource::snapshot(&volume.name, name);
        let session = self.session(cancel, "snapshot creation", target).await?;
        session.create_snapshot(volume, name).await
    }

    /// Creates a FlexClone volume from an existing snapshot.
    ///
    /// Returns the clone volume name.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::AlreadyExists`] when the target name is taken,
    /// [`OntapError::CreateFailed`] when the API rejects the request and
    /// [`OntapError::VerificationFailed`] when the clone never appears.
    pub async fn create_clone(
        &self,
        spec: &CloneSpec,
        cancel: &CancellationToken,
    ) -> Result<String, OntapError> {
        spec.validate()?;
        info!(
            source = %spec.source_volume,
            snapshot = %spec.source_snapshot,
            clone = %spec.clone_volume,
            svm = %spec.svm,
            "creating FlexClone"
        );
        let target = Resource::from(&spec.target());
        let session = self.session(cancel, "clone creation", target).await?;
        session.create_clone(spec).await
    }

    /// Deletes a volume by name.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::NotFound`] for an unknown volume,
    /// [`OntapError::DeleteFailed`] when the API rejects the request and,
    /// with strict delete verification, [`OntapError::VerificationFailed`]
    /// when the volume is still listed after the settle budget.
    pub async fn delete_volume(
        &self,
        volume: &VolumeRef,
        cancel: &CancellationToken,
    ) -> Result<(), OntapError> {
        volume.validate()?;
        info!(volume = %volume.name, "deleting volume");
        let session = self
            .session(cancel, "volume deletion", Resource::from(volume))
            .await?;
        session.delete_volume(volume).await
    }

    /// Deletes a snapshot by volume and snapshot name.
    ///
    /// # Errors
    ///
    /// Returns [`OntapError::NotFound`] naming the volume or the snapshot,
    /// [`OntapError::DeleteFailed`] when the API rejects the request and,
    /// with strict delete verification, [`OntapError::VerificationFailed`].
    pub async fn delete_snapshot(
        &self,
        volume: &VolumeRef,
        snapshot: &str,
        cancel: &CancellationToken,
    ) -> Result<(), OntapError> {
        volume.validate()?;
        let name = require_name("snapshot", snapshot)?;
        info!(volume = %volume.name, snapshot = name, "deleting snapshot");
        let target = Resource::snapshot(&volume.name, name);
        let session = self.session(cancel, "snapshot deletion", target).await?;
        session.delete_snapshot(volume, name).await
    }

    async fn session<'c>(
        &self,
        cancel: &'c CancellationToken,
        operation: &'static str,
        target: Resource,
    ) -> Result<Session<'c, C::Transport>, OntapError> {
        let credential = cancellable(cancel, operation, &target, self.credentials.get()).await??;
        let transport = self
            .connector
            .connect(&self.endpoint, &credential)
            .map_err(|err| OntapError::Transport {
                context: format!("connect to {}", self.endpoint.admin_address),
                message: err.to_string(),
            })?;
        Ok(Session::new(transport, cancel, operation, target, self.policy))
    }
}
