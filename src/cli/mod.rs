//! Command-line interface definitions for the `flexsnap` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `flexsnap` binary.
#[derive(Debug, Parser)]
#[command(
    name = "flexsnap",
    about = "Create snapshots and FlexClones of ONTAP volumes, and clean them up",
    long_about = "Create snapshots and FlexClones of ONTAP volumes, and clean them up.\n\n\
        Endpoint settings come from ONTAP_* environment variables or flexsnap.toml; \
        the password is read from AWS Secrets Manager.",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a snapshot of a volume unless it already exists.
    #[command(name = "snapshot")]
    Snapshot(SnapshotCommand),
    /// Create a FlexClone volume from a snapshot.
    #[command(name = "clone")]
    CloneVolume(CloneCommand),
    /// Delete a snapshot.
    #[command(name = "delete-snapshot")]
    DeleteSnapshot(SnapshotCommand),
    /// Delete a volume, typically a FlexClone.
    #[command(name = "delete-volume")]
    DeleteVolume(VolumeCommand),
    /// Report whether a volume exists.
    #[command(name = "volume-exists")]
    VolumeExists(VolumeCommand),
}

/// Arguments naming a snapshot on a volume.
#[derive(Debug, Parser)]
pub(crate) struct SnapshotCommand {
    /// Name of the parent volume.
    #[arg(long, value_name = "VOLUME")]
    pub(crate) volume: String,
    /// Name of the snapshot.
    #[arg(long, value_name = "SNAPSHOT")]
    pub(crate) snapshot: String,
}

/// Arguments for `flexsnap clone`.
#[derive(Debug, Parser)]
pub(crate) struct CloneCommand {
    /// Name of the parent volume.
    #[arg(long, value_name = "VOLUME")]
    pub(crate) source_volume: String,
    /// Name of the parent snapshot.
    #[arg(long, value_name = "SNAPSHOT")]
    pub(crate) snapshot: String,
    /// Name of the clone volume to create.
    #[arg(long, value_name = "VOLUME")]
    pub(crate) clone_volume: String,
    /// Storage virtual machine that owns the source and the clone.
    #[arg(long, value_name = "SVM")]
    pub(crate) svm: String,
    /// Comment stored on the clone; defaults to naming the parent snapshot.
    #[arg(long, value_name = "TEXT")]
    pub(crate) comment: Option<String>,
}

/// Arguments naming a volume, optionally scoped to an SVM.
#[derive(Debug, Parser)]
pub(crate) struct VolumeCommand {
    /// Name of the volume.
    #[arg(long, value_name = "VOLUME")]
    pub(crate) volume: String,
    /// Storage virtual machine scope for the lookup.
    #[arg(long, value_name = "SVM")]
    pub(crate) svm: Option<String>,
}
