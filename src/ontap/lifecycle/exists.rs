//! Existence checks. A transport or status failure is an error, never
//! "does not exist".

use super::{Session, snapshot_query, volume_query};
use crate::ontap::error::{OntapError, Resource};
use crate::ontap::types::VolumeUuid;
use crate::resource::VolumeRef;
use crate::transport::Transport;

impl<T: Transport> Session<'_, T> {
    pub(in crate::ontap) async fn volume_exists(
        &self,
        volume: &VolumeRef,
    ) -> Result<bool, OntapError> {
        let context = format!("existence check for {}", Resource::from(volume));
        let records = self.list(volume_query(volume), &context).await?;
        Ok(!records.is_empty())
    }

    pub(in crate::ontap) async fn snapshot_exists(
        &self,
        volume: VolumeUuid,
        label: &str,
        snapshot: &str,
    ) -> Result<bool, OntapError> {
        let context = format!(
            "existence check for {}",
            Resource::snapshot(label, snapshot)
        );
        let records = self
            .list(snapshot_query(volume, snapshot), &context)
            .await?;
        Ok(!records.is_empty())
    }
}
