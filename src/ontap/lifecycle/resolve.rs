//! Name to UUID resolution.
//!
//! Lookups yield `Option`; only the `require_*` helpers turn absence into
//! [`OntapError::NotFound`].

use uuid::Uuid;

use super::{Session, snapshot_query, volume_query};
use crate::ontap::error::{OntapError, Resource};
use crate::ontap::records::Record;
use crate::ontap::types::{SnapshotUuid, VolumeUuid};
use crate::resource::VolumeRef;
use crate::transport::Transport;

impl<T: Transport> Session<'_, T> {
    pub(in crate::ontap) async fn lookup_volume(
        &self,
        volume: &VolumeRef,
    ) -> Result<Option<VolumeUuid>, OntapError> {
        let resource = Resource::from(volume);
        let context = format!("lookup of {resource}");
        let records = self.list(volume_query(volume), &context).await?;
        single_uuid(&records, resource, &context).map(|found| found.map(VolumeUuid::from))
    }

    pub(in crate::ontap) async fn require_volume(
        &self,
        volume: &VolumeRef,
    ) -> Result<VolumeUuid, OntapError> {
        self.lookup_volume(volume)
            .await?
            .ok_or_else(|| OntapError::NotFound {
                resource: Resource::from(volume),
            })
    }

    /// `label` names the parent volume in errors and logs.
    pub(in crate::ontap) async fn lookup_snapshot(
        &self,
        volume: VolumeUuid,
        label: &str,
        snapshot: &str,
    ) -> Result<Option<SnapshotUuid>, OntapError> {
        let resource = Resource::snapshot(label, snapshot);
        let context = format!("lookup of {resource}");
        let records = self
            .list(snapshot_query(volume, snapshot), &context)
            .await?;
        single_uuid(&records, resource, &context).map(|found| found.map(SnapshotUuid::from))
    }
}

fn single_uuid(
    records: &[Record],
    resource: Resource,
    context: &str,
) -> Result<Option<Uuid>, OntapError> {
    match records {
        [] => Ok(None),
        [record] => record
            .require_uuid()
            .map(Some)
            .map_err(|message| OntapError::MalformedResponse {
                context: context.to_owned(),
                message,
            }),
        _ => Err(OntapError::Ambiguous {
            resource,
            matches: records.len(),
        }),
    }
}
