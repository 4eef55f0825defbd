//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::ontap::{LifecyclePolicy, OntapError, SettlePolicy};
use crate::resource::ManagementEndpoint;
use crate::secret::DEFAULT_AWS_BIN;

const APP_NAME: &str = "flexsnap";
const CONFIG_FILE: &str = "flexsnap.toml";

/// Endpoint, credential and policy settings derived from environment
/// variables and configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "ONTAP",
    discovery(
        app_name = "flexsnap",
        env_var = "FLEXSNAP_CONFIG_PATH",
        config_file_name = "flexsnap.toml",
        dotfile_name = ".flexsnap.toml",
        project_file_name = "flexsnap.toml"
    )
)]
pub struct OntapConfig {
    /// Management address of the file system (IP or host name).
    #[ortho_config(default = String::new())]
    pub admin_address: String,
    /// ONTAP user for basic authentication, for example `vsadmin`.
    #[ortho_config(default = String::new())]
    pub username: String,
    /// Name of the Secrets Manager secret holding the password.
    #[ortho_config(default = String::new())]
    pub secret_name: String,
    /// Region of the secret.
    #[ortho_config(default = String::new())]
    pub region: String,
    /// Timeout applied to every management request, in seconds.
    #[ortho_config(default = 30)]
    pub request_timeout_secs: u64,
    /// Settle budget after creating a snapshot, in seconds.
    #[ortho_config(default = 5)]
    pub snapshot_settle_secs: u64,
    /// Settle budget after creating a clone, in seconds.
    #[ortho_config(default = 10)]
    pub clone_settle_secs: u64,
    /// Settle budget after a deletion, in seconds.
    #[ortho_config(default = 5)]
    pub delete_settle_secs: u64,
    /// Pause before the first settle check, in milliseconds.
    #[ortho_config(default = 500)]
    pub poll_initial_ms: u64,
    /// Upper bound for a single settle pause, in milliseconds.
    #[ortho_config(default = 2000)]
    pub poll_max_interval_ms: u64,
    /// Fail snapshot creation when the existence precheck fails.
    #[ortho_config(default = false)]
    pub strict_precheck: bool,
    /// Fail deletions whose resource is still listed after the settle budget.
    #[ortho_config(default = false)]
    pub strict_delete_verification: bool,
    /// Path to the `aws` executable used for secret lookup.
    #[ortho_config(default = DEFAULT_AWS_BIN.to_owned())]
    pub aws_bin: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to {CONFIG_FILE}",
            self.description, self.env_var, self.toml_key
        ))
    }

    fn invalid(&self, reason: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "{} {reason}: check {} or {} in {CONFIG_FILE}",
            self.description, self.env_var, self.toml_key
        ))
    }
}

impl OntapConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from(APP_NAME)])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that supply each value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required value is blank
    /// and [`ConfigError::Invalid`] when a timing value is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (
                &self.admin_address,
                FieldMetadata::new("management address", "ONTAP_ADMIN_ADDRESS", "admin_address"),
            ),
            (
                &self.username,
                FieldMetadata::new("management user", "ONTAP_USERNAME", "username"),
            ),
            (
                &self.secret_name,
                FieldMetadata::new("password secret name", "ONTAP_SECRET_NAME", "secret_name"),
            ),
            (
                &self.region,
                FieldMetadata::new("secret region", "ONTAP_REGION", "region"),
            ),
        ];
        for (value, metadata) in &required {
            if value.trim().is_empty() {
                return Err(metadata.missing());
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(FieldMetadata::new(
                "request timeout",
                "ONTAP_REQUEST_TIMEOUT_SECS",
                "request_timeout_secs",
            )
            .invalid("must be greater than zero"));
        }
        if self.poll_initial_ms == 0 {
            return Err(FieldMetadata::new(
                "initial poll delay",
                "ONTAP_POLL_INITIAL_MS",
                "poll_initial_ms",
            )
            .invalid("must be greater than zero"));
        }
        if self.poll_max_interval_ms < self.poll_initial_ms {
            return Err(FieldMetadata::new(
                "maximum poll interval",
                "ONTAP_POLL_MAX_INTERVAL_MS",
                "poll_max_interval_ms",
            )
            .invalid("must not be below poll_initial_ms"));
        }
        if self.aws_bin.trim().is_empty() {
            return Err(FieldMetadata::new("AWS CLI path", "ONTAP_AWS_BIN", "aws_bin").missing());
        }
        Ok(())
    }

    /// Builds the validated [`ManagementEndpoint`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn endpoint(&self) -> Result<ManagementEndpoint, ConfigError> {
        self.validate()?;
        ManagementEndpoint::new(
            &self.admin_address,
            &self.username,
            &self.secret_name,
            &self.region,
        )
        .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Settle budgets and strictness flags for the lifecycle manager.
    #[must_use]
    pub const fn lifecycle_policy(&self) -> LifecyclePolicy {
        let initial = Duration::from_millis(self.poll_initial_ms);
        let max_interval = Duration::from_millis(self.poll_max_interval_ms);
        LifecyclePolicy {
            snapshot_settle: SettlePolicy::new(
                initial,
                max_interval,
                Duration::from_secs(self.snapshot_settle_secs),
            ),
            clone_settle: SettlePolicy::new(
                initial,
                max_interval,
                Duration::from_secs(self.clone_settle_secs),
            ),
            delete_settle: SettlePolicy::new(
                initial,
                max_interval,
                Duration::from_secs(self.delete_settle_secs),
            ),
            strict_precheck: self.strict_precheck,
            strict_delete_verification: self.strict_delete_verification,
        }
    }

    /// Timeout applied to each management request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configured value is out of range.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<ConfigError> for OntapError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
