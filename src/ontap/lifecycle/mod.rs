//! Per-operation session and the request flows built on it.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{OntapError, Resource};
use super::policy::LifecyclePolicy;
use super::records::{Collection, Record};
use super::types::VolumeUuid;
use crate::resource::VolumeRef;
use crate::transport::{ApiRequest, ApiResponse, Transport};

mod clone;
mod delete;
mod exists;
mod resolve;
mod snapshot;
mod wait;

#[cfg(test)]
mod tests;

const VOLUMES: &str = "/storage/volumes";

/// Runs `future` unless `cancel` fires first.
pub(super) async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    operation: &str,
    resource: &Resource,
    future: F,
) -> Result<F::Output, OntapError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(OntapError::Cancelled {
            operation: operation.to_owned(),
            resource: resource.clone(),
        }),
        output = future => Ok(output),
    }
}

/// Transport and policy scoped to a single lifecycle operation on one
/// target resource.
pub(super) struct Session<'c, T> {
    transport: T,
    cancel: &'c CancellationToken,
    operation: &'static str,
    target: Resource,
    policy: LifecyclePolicy,
}

impl<'c, T: Transport> Session<'c, T> {
    pub(super) const fn new(
        transport: T,
        cancel: &'c CancellationToken,
        operation: &'static str,
        target: Resource,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            transport,
            cancel,
            operation,
            target,
            policy,
        }
    }

    async fn call(&self, request: ApiRequest, context: &str) -> Result<ApiResponse, OntapError> {
        cancellable(
            self.cancel,
            self.operation,
            &self.target,
            self.transport.send(request),
        )
        .await?
        .map_err(|err| OntapError::Transport {
            context: context.to_owned(),
            message: err.to_string(),
        })
    }

    async fn list(&self, request: ApiRequest, context: &str) -> Result<Vec<Record>, OntapError> {
        let response = self.call(request, context).await?;
        if !response.is_success() {
            return Err(OntapError::QueryFailed {
                context: context.to_owned(),
                status: response.status,
                body: response.body,
            });
        }
        Collection::from_body(&response.body)
            .map(|collection| collection.records)
            .map_err(|err| OntapError::MalformedResponse {
                context: context.to_owned(),
                message: err.to_string(),
            })
    }

    async fn pause(&self, duration: Duration) -> Result<(), OntapError> {
        cancellable(
            self.cancel,
            self.operation,
            &self.target,
            tokio::time::sleep(duration),
        )
        .await
    }
}

fn volume_query(volume: &VolumeRef) -> ApiRequest {
    let mut request = ApiRequest::get(VOLUMES).query("name", &volume.name);
    if let Some(svm) = &volume.svm {
        request = request.query("svm.name", svm);
    }
    request.query("fields", "uuid")
}

fn snapshots_path(volume: VolumeUuid) -> String {
    format!("{VOLUMES}/{volume}/snapshots")
}

fn snapshot_query(volume: VolumeUuid, snapshot: &str) -> ApiRequest {
    ApiRequest::get(snapshots_path(volume))
        .query("name", snapshot)
        .query("fields", "uuid")
}

fn encode<B: Serialize>(body: &B, context: &str) -> Result<Value, OntapError> {
    serde_json::to_value(body)
        .map_err(|err| OntapError::InvalidRequest(format!("{context}: {err}")))
}
