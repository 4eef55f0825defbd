//! Volume and snapshot deletion with post-delete settling.

use tracing::info;

use super::wait::Watch;
use super::{Session, VOLUMES, snapshots_path};
use crate::ontap::error::{OntapError, Resource};
use crate::resource::VolumeRef;
use crate::transport::{ApiRequest, ApiResponse, Transport};

fn rejected(resource: Resource, response: ApiResponse) -> OntapError {
    OntapError::DeleteFailed {
        resource,
        status: response.status,
        body: response.body,
    }
}

impl<T: Transport> Session<'_, T> {
    pub(in crate::ontap) async fn delete_volume(
        &self,
        volume: &VolumeRef,
    ) -> Result<(), OntapError> {
        let volume_uuid = self.require_volume(volume).await?;
        let resource = Resource::from(volume);
        let context = format!("delete {resource}");
        let response = self
            .call(ApiRequest::delete(format!("{VOLUMES}/{volume_uuid}")), &context)
            .await?;
        if !response.is_success() {
            return Err(rejected(resource, response));
        }

        info!(%resource, uuid = %volume_uuid, "volume delete accepted");
        self.confirm_absent(&Watch::Volume(volume), resource).await
    }

    pub(in crate::ontap) async fn delete_snapshot(
        &self,
        volume: &VolumeRef,
        snapshot: &str,
    ) -> Result<(), OntapError> {
        let volume_uuid = self.require_volume(volume).await?;
        let resource = Resource::snapshot(&volume.name, snapshot);
        let snapshot_uuid = self
            .lookup_snapshot(volume_uuid, &volume.name, snapshot)
            .await?
            .ok_or_else(|| OntapError::NotFound {
                resource: resource.clone(),
            })?;

        let context = format!("delete {resource}");
        let path = format!("{}/{snapshot_uuid}", snapshots_path(volume_uuid));
        let response = self.call(ApiRequest::delete(path), &context).await?;
        if !response.is_success() {
            return Err(rejected(resource, response));
        }

        info!(%resource, uuid = %snapshot_uuid, "snapshot delete accepted");
        let target = Watch::Snapshot {
            volume: volume_uuid,
            label: &volume.name,
            name: snapshot,
        };
        self.confirm_absent(&target, resource).await
    }
}
