//! Idempotent snapshot creation.

use tracing::{info, warn};

use super::wait::Watch;
use super::{Session, encode, snapshots_path};
use crate::ontap::error::{OntapError, Resource};
use crate::ontap::records::CreateSnapshotBody;
use crate::resource::VolumeRef;
use crate::transport::{ApiRequest, Transport};

impl<T: Transport> Session<'_, T> {
    pub(in crate::ontap) async fn create_snapshot(
        &self,
        volume: &VolumeRef,
        snapshot: &str,
    ) -> Result<String, OntapError> {
        let volume_uuid = self.require_volume(volume).await?;
        let resource = Resource::snapshot(&volume.name, snapshot);
        let target = Watch::Snapshot {
            volume: volume_uuid,
            label: &volume.name,
            name: snapshot,
        };

        match self.snapshot_exists(volume_uuid, &volume.name, snapshot).await {
            Ok(true) => {
                info!(%resource, "snapshot already exists");
                return Ok(snapshot.to_owned());
            }
            Ok(false) => {}
            Err(err @ OntapError::Cancelled { .. }) => return Err(err),
            Err(err) if self.policy.strict_precheck => return Err(err),
            Err(err) => warn!(%resource, error = %err, "snapshot precheck failed; creating anyway"),
        }

        let context = format!("create {resource}");
        let body = encode(&CreateSnapshotBody { name: snapshot }, &context)?;
        let response = self
            .call(ApiRequest::post(snapshots_path(volume_uuid), body), &context)
            .await?;
        if !response.is_success() {
            return Err(OntapError::CreateFailed {
                resource,
                status: response.status,
                body: response.body,
            });
        }

        info!(%resource, status = response.status, "snapshot create accepted");
        self.confirm_present(&self.policy.snapshot_settle, &target, resource)
            .await?;
        Ok(snapshot.to_owned())
    }
}
