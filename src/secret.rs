//! Secret lookup for the management-plane password.
//!
//! The lifecycle manager treats the secret store as an opaque
//! `name + region -> value` lookup. The default implementation shells out to
//! the AWS CLI so the host's ambient AWS credentials and profile handling
//! apply unchanged.

use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::debug;

use crate::command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};

/// Default AWS CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

/// Future returned by [`SecretSource::fetch`].
pub type SecretFuture<'a> = Pin<Box<dyn Future<Output = Result<String, SecretError>> + Send + 'a>>;

/// Errors raised by a secret source.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SecretError {
    /// Raised when the secret exists but carries no string value.
    #[error("secret '{name}' has no value")]
    Missing {
        /// Secret name.
        name: String,
    },
    /// Raised when the lookup itself fails.
    #[error("lookup of secret '{name}' failed: {message}")]
    Lookup {
        /// Secret name.
        name: String,
        /// Failure description from the backend.
        message: String,
    },
    /// Raised when the lookup command cannot be started.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Opaque key-value lookup for secrets.
pub trait SecretSource: Send + Sync {
    /// Fetches the secret called `name` from `region`.
    fn fetch<'a>(&'a self, name: &'a str, region: &'a str) -> SecretFuture<'a>;
}

/// Reads secrets from AWS Secrets Manager through the `aws` CLI.
#[derive(Clone, Debug)]
pub struct AwsCliSecretSource<R: CommandRunner> {
    aws_bin: String,
    runner: R,
}

impl AwsCliSecretSource<ProcessCommandRunner> {
    /// Creates a source wired to the real process runner.
    #[must_use]
    pub fn with_process_runner(aws_bin: impl Into<String>) -> Self {
        Self::new(aws_bin, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> AwsCliSecretSource<R> {
    /// Creates a source that runs `aws_bin` through `runner`.
    #[must_use]
    pub fn new(aws_bin: impl Into<String>, runner: R) -> Self {
        Self {
            aws_bin: aws_bin.into(),
            runner,
        }
    }

    fn build_args(name: &str, region: &str) -> Vec<OsString> {
        [
            "secretsmanager",
            "get-secret-value",
            "--secret-id",
            name,
            "--region",
            region,
            "--query",
            "SecretString",
            "--output",
            "text",
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    fn interpret(name: &str, output: &CommandOutput) -> Result<String, SecretError> {
        if !output.is_success() {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!("aws exited with status {}", output.status_text())
            } else {
                format!("aws exited with status {}: {stderr}", output.status_text())
            };
            return Err(SecretError::Lookup {
                name: name.to_owned(),
                message,
            });
        }

        // `--output text` renders a null SecretString as the literal `None`.
        let value = output.stdout.trim();
        if value.is_empty() || value == "None" {
            return Err(SecretError::Missing {
                name: name.to_owned(),
            });
        }
        Ok(value.to_owned())
    }
}

impl<R> SecretSource for AwsCliSecretSource<R>
where
    R: CommandRunner + Clone + 'static,
{
    fn fetch<'a>(&'a self, name: &'a str, region: &'a str) -> SecretFuture<'a> {
        Box::pin(async move {
            debug!(secret = name, region, "reading secret through the AWS CLI");
            let runner = self.runner.clone();
            let program = self.aws_bin.clone();
            let args = Self::build_args(name, region);
            let output = tokio::task::spawn_blocking(move || runner.run(&program, &args))
                .await
                .map_err(|err| SecretError::Lookup {
                    name: name.to_owned(),
                    message: err.to_string(),
                })??;
            Self::interpret(name, &output)
        })
    }
}
