//! Binary entry point for the `flexsnap` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use flexsnap::{
    AwsCliSecretSource, CloneSpec, ConfigError, HttpConnector, OntapConfig, OntapError,
    OntapManager, ProcessCommandRunner, RequestError, Resource, VolumeRef,
};

mod cli;

use cli::{Cli, CloneCommand, SnapshotCommand, VolumeCommand};

type Manager = OntapManager<AwsCliSecretSource<ProcessCommandRunner>, HttpConnector>;

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid argument: {0}")]
    Request(#[from] RequestError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ontap(#[from] OntapError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Validated work item derived from the command line.
#[derive(Debug, PartialEq, Eq)]
enum Task {
    Snapshot { volume: VolumeRef, snapshot: String },
    Clone(CloneSpec),
    DeleteSnapshot { volume: VolumeRef, snapshot: String },
    DeleteVolume(VolumeRef),
    VolumeExists(VolumeRef),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let exit_code = match dispatch(cli, &cancel).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling the running operation");
            cancel.cancel();
        }
    });
}

async fn dispatch(cli: Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    let task = plan(cli)?;
    let config = OntapConfig::load_without_cli_args()?;
    let manager = build_manager(&config)?;
    execute(&manager, task, cancel).await
}

fn build_manager(config: &OntapConfig) -> Result<Manager, CliError> {
    let endpoint = config.endpoint()?;
    let source = AwsCliSecretSource::with_process_runner(config.aws_bin.trim());
    let connector = HttpConnector::new(config.request_timeout());
    Ok(OntapManager::new(endpoint, source, connector).with_policy(config.lifecycle_policy()))
}

fn required(field: &str, value: &str) -> Result<String, RequestError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RequestError::Validation(field.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn snapshot_target(args: &SnapshotCommand) -> Result<(VolumeRef, String), RequestError> {
    let volume = VolumeRef::new(&args.volume);
    volume.validate()?;
    Ok((volume, required("snapshot", &args.snapshot)?))
}

fn volume_target(args: VolumeCommand) -> Result<VolumeRef, RequestError> {
    let volume = VolumeRef::new(args.volume).in_svm(args.svm);
    volume.validate()?;
    Ok(volume)
}

fn clone_spec(args: CloneCommand) -> Result<CloneSpec, RequestError> {
    CloneSpec::builder()
        .source_volume(args.source_volume)
        .source_snapshot(args.snapshot)
        .clone_volume(args.clone_volume)
        .svm(args.svm)
        .comment(args.comment)
        .build()
}

/// Validates arguments before any configuration or network access.
fn plan(cli: Cli) -> Result<Task, RequestError> {
    Ok(match cli {
        Cli::Snapshot(args) => {
            let (volume, snapshot) = snapshot_target(&args)?;
            Task::Snapshot { volume, snapshot }
        }
        Cli::CloneVolume(args) => Task::Clone(clone_spec(args)?),
        Cli::DeleteSnapshot(args) => {
            let (volume, snapshot) = snapshot_target(&args)?;
            Task::DeleteSnapshot { volume, snapshot }
        }
        Cli::DeleteVolume(args) => Task::DeleteVolume(volume_target(args)?),
        Cli::VolumeExists(args) => Task::VolumeExists(volume_target(args)?),
    })
}

async fn execute(
    manager: &Manager,
    task: Task,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match task {
        Task::Snapshot { volume, snapshot } => {
            let name = manager.create_snapshot(&volume, &snapshot, cancel).await?;
            writeln!(io::stdout(), "{name}")?;
        }
        Task::Clone(spec) => {
            let source = VolumeRef::new(&spec.source_volume).in_svm(Some(spec.svm.clone()));
            if !manager.volume_exists(&source, cancel).await? {
                return Err(OntapError::NotFound {
                    resource: Resource::from(&source),
                }
                .into());
            }
            let name = manager.create_clone(&spec, cancel).await?;
            writeln!(io::stdout(), "{name}")?;
        }
        Task::DeleteSnapshot { volume, snapshot } => {
            manager.delete_snapshot(&volume, &snapshot, cancel).await?;
            info!(volume = %volume.name, snapshot = %snapshot, "snapshot deleted");
        }
        Task::DeleteVolume(volume) => {
            manager.delete_volume(&volume, cancel).await?;
            info!(volume = %volume.name, "volume deleted");
        }
        Task::VolumeExists(volume) => {
            let exists = manager.volume_exists(&volume, cancel).await?;
            writeln!(io::stdout(), "{}", if exists { "present" } else { "absent" })?;
        }
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "error: {err}").ok();
}
