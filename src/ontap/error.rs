//! Error types for the ONTAP lifecycle manager.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::resource::{RequestError, VolumeRef};

/// Names the resource an error refers to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resource {
    /// A volume, optionally scoped to a storage virtual machine.
    Volume {
        /// Volume name.
        name: String,
        /// SVM scope used for the lookup.
        svm: Option<String>,
    },
    /// A snapshot under a parent volume.
    Snapshot {
        /// Parent volume name (or UUID when only the UUID is known).
        volume: String,
        /// Snapshot name.
        snapshot: String,
    },
}

impl Resource {
    /// Builds a snapshot resource label.
    #[must_use]
    pub fn snapshot(volume: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self::Snapshot {
            volume: volume.into(),
            snapshot: snapshot.into(),
        }
    }
}

impl From<&VolumeRef> for Resource {
    fn from(value: &VolumeRef) -> Self {
        Self::Volume {
            name: value.name.clone(),
            svm: value.svm.clone(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume { name, svm: None } => write!(f, "volume '{name}'"),
            Self::Volume {
                name,
                svm: Some(svm),
            } => write!(f, "volume '{name}' in SVM '{svm}'"),
            Self::Snapshot { volume, snapshot } => {
                write!(f, "snapshot '{snapshot}' on volume '{volume}'")
            }
        }
    }
}

/// Expected end-state checked after a mutating call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    /// The resource should be listed.
    Present,
    /// The resource should no longer be listed.
    Absent,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// Errors raised by the lifecycle manager.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OntapError {
    /// Raised when configuration cannot be loaded or is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a request is missing a required value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Raised when the management password cannot be obtained.
    #[error("secret '{secret}' in region {region} is unavailable: {message}")]
    SecretUnavailable {
        /// Secret name.
        secret: String,
        /// Secret region.
        region: String,
        /// Underlying failure.
        message: String,
    },
    /// Raised when a name does not resolve to a remote resource.
    #[error("{resource} not found")]
    NotFound {
        /// The resource that could not be found.
        resource: Resource,
    },
    /// Raised when a clone target name is already taken.
    #[error("{resource} already exists; delete it first or use a different name")]
    AlreadyExists {
        /// The conflicting resource.
        resource: Resource,
    },
    /// Raised when a name matches several records where one was required.
    #[error("{resource} matched {matches} records")]
    Ambiguous {
        /// The resource being resolved.
        resource: Resource,
        /// Number of matching records.
        matches: usize,
    },
    /// Raised when a create call returns a non-success status.
    #[error("failed to create {resource}: status {status}: {body}")]
    CreateFailed {
        /// Resource being created.
        resource: Resource,
        /// HTTP status code.
        status: u16,
        /// Response body returned by the API.
        body: String,
    },
    /// Raised when a delete call returns a non-success status.
    #[error("failed to delete {resource}: status {status}: {body}")]
    DeleteFailed {
        /// Resource being deleted.
        resource: Resource,
        /// HTTP status code.
        status: u16,
        /// Response body returned by the API.
        body: String,
    },
    /// Raised when the expected end-state is not observed after a mutation.
    #[error("verification failed: {resource} was not {expected} within {waited:?}")]
    VerificationFailed {
        /// Resource being verified.
        resource: Resource,
        /// Expected end-state.
        expected: Presence,
        /// Total settle budget that elapsed.
        waited: Duration,
    },
    /// Raised when a read returns a non-success status.
    #[error("{context} failed with status {status}: {body}")]
    QueryFailed {
        /// Description of the read, naming the resource.
        context: String,
        /// HTTP status code.
        status: u16,
        /// Response body returned by the API.
        body: String,
    },
    /// Raised when a response body cannot be interpreted.
    #[error("{context} returned an unexpected response: {message}")]
    MalformedResponse {
        /// Description of the call, naming the resource.
        context: String,
        /// Decoder message.
        message: String,
    },
    /// Raised for network, timeout and TLS failures.
    #[error("{context}: {message}")]
    Transport {
        /// Description of the call, naming the resource.
        context: String,
        /// Transport failure message.
        message: String,
    },
    /// Raised when the caller cancels an operation.
    #[error("{operation} of {resource} was cancelled")]
    Cancelled {
        /// Operation that was interrupted.
        operation: String,
        /// Resource the operation targeted.
        resource: Resource,
    },
}

impl From<RequestError> for OntapError {
    fn from(value: RequestError) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}
