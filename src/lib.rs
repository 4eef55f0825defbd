//! Core library for the `flexsnap` ONTAP lifecycle tool.
//!
//! The crate drives snapshot creation, FlexClone provisioning and deletion
//! against an ONTAP cluster's management REST API. Each mutating call is
//! followed by a bounded settle loop that confirms the cluster reports the
//! expected state before the operation returns.

pub mod command;
pub mod config;
pub mod credential;
pub mod ontap;
pub mod resource;
pub mod secret;
pub mod test_support;
pub mod transport;

pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{ConfigError, OntapConfig};
pub use credential::{Credential, CredentialCache};
pub use ontap::{
    LifecyclePolicy, MIN_POLL_INTERVAL, OntapError, OntapManager, Presence, Resource,
    SettlePolicy, SnapshotUuid, VolumeUuid,
};
pub use resource::{CloneSpec, CloneSpecBuilder, ManagementEndpoint, RequestError, VolumeRef};
pub use secret::{AwsCliSecretSource, DEFAULT_AWS_BIN, SecretError, SecretSource};
pub use transport::{
    ApiRequest, ApiResponse, Connector, HttpConnector, Method, Transport, TransportError,
};
