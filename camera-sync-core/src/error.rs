//! Error types shared across the core pipeline.
//!
//! Errors that can misdirect data (an ambiguous match, a missing destination root) are fatal
//! for the whole run and surface as [`SyncError`]. Errors confined to one file never become
//! an `Err` at all: they are captured on the [`crate::operation::OperationResult`] instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::SourceType;

/// Failure to obtain the list of mounted volumes.
#[derive(Debug, Error)]
pub enum DiskListError {
    #[error("disk listing is not implemented for platform `{0}`")]
    UnsupportedPlatform(&'static str),
    #[error("failed to run `{command}`: {message}")]
    Command { command: String, message: String },
    #[error("failed to parse disk listing: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read disk listing: {0}")]
    Io(#[from] std::io::Error),
}

/// The disk matcher could not produce a one-to-one pairing.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("sync #{sync_index} ({source_type}) matches {} volumes: {}", .mount_paths.len(), display_paths(.mount_paths))]
    Ambiguous {
        sync_index: usize,
        source_type: SourceType,
        mount_paths: Vec<PathBuf>,
    },
    #[error("volume {mount_path:?} is matched by both sync #{first} and sync #{second}")]
    DuplicateVolume {
        mount_path: PathBuf,
        first: usize,
        second: usize,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Enumeration of a volume failed.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source type `{0}` has no file layout rule")]
    Unsupported(SourceType),
    #[error("invalid scan pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

/// Configuration that parsed but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sync #{sync_index} has an empty `match_on` list")]
    NoCriteria { sync_index: usize },
    #[error("sync #{sync_index} matches on `{criterion}` but does not set it")]
    MissingAttribute {
        sync_index: usize,
        criterion: &'static str,
    },
    #[error("sync #{first} and sync #{second} cannot be told apart by their match criteria")]
    Indistinguishable { first: usize, second: usize },
}

/// Fatal conditions that abort a synchronisation run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("listing disks failed: {0}")]
    DisksUnavailable(#[from] DiskListError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("destination {path:?} does not exist or is not a directory")]
    MissingDestination { path: PathBuf },
    #[error("destination {path:?} is read-only")]
    ReadOnlyDestination { path: PathBuf },
}
