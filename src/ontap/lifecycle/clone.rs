//! FlexClone creation from a parent snapshot.

use tracing::info;

use super::wait::Watch;
use super::{Session, VOLUMES, encode};
use crate::ontap::error::{OntapError, Resource};
use crate::ontap::records::CreateCloneBody;
use crate::resource::CloneSpec;
use crate::transport::{ApiRequest, Transport};

impl<T: Transport> Session<'_, T> {
    pub(in crate::ontap) async fn create_clone(
        &self,
        spec: &CloneSpec,
    ) -> Result<String, OntapError> {
        let clone_ref = spec.target();
        let resource = Resource::from(&clone_ref);
        if self.volume_exists(&clone_ref).await? {
            return Err(OntapError::AlreadyExists { resource });
        }

        let context = format!("create {resource}");
        let body = encode(&CreateCloneBody::new(spec), &context)?;
        let response = self
            .call(ApiRequest::post(VOLUMES, body), &context)
            .await?;
        if !response.is_success() {
            return Err(OntapError::CreateFailed {
                resource,
                status: response.status,
                body: response.body,
            });
        }

        info!(%resource, status = response.status, "clone create accepted");
        self.confirm_present(
            &self.policy.clone_settle,
            &Watch::Volume(&clone_ref),
            resource,
        )
        .await?;
        Ok(spec.clone_volume.clone())
    }
}
