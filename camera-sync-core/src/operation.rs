//! Planned file operations and their execution.
//!
//! Execution never returns an error: every failure is captured on the [`OperationResult`]
//! so the caller can tally it and carry on with the next file.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Destination is missing: copy content and metadata.
    Copy,
    /// Destination content is in place: refresh its metadata only.
    CopyStat,
    /// Destination already holds the same file.
    Identical,
    /// Destination holds a different file under the same name.
    Unknown,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Copy => "copy",
            OperationKind::CopyStat => "copy_stat",
            OperationKind::Identical => "identical",
            OperationKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Why an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The planner could not reconcile source and destination.
    Unreconcilable,
    NotFound,
    PermissionDenied,
    AlreadyExists,
    StorageFull,
    Other,
}

impl FailureKind {
    pub fn from_io(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FailureKind::NotFound,
            io::ErrorKind::PermissionDenied => FailureKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => FailureKind::AlreadyExists,
            io::ErrorKind::StorageFull => FailureKind::StorageFull,
            _ => FailureKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unreconcilable => "unreconcilable",
            FailureKind::NotFound => "not_found",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::AlreadyExists => "already_exists",
            FailureKind::StorageFull => "storage_full",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub operation: Operation,
    pub success: bool,
    pub error_kind: Option<FailureKind>,
    pub error: Option<String>,
    pub dry_run: bool,
}

/// Filesystem mutations needed to carry out operations.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait FileOps: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copies content, permissions and timestamps. Must not replace an existing file.
    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<()>;

    /// Copies permissions and timestamps onto an existing destination.
    fn copy_metadata(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

/// [`FileOps`] against the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
        if destination.symlink_metadata().is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{destination:?} already exists"),
            ));
        }

        // Copy under a temporary name so an interrupted copy never leaves a truncated file
        // at the final path.
        let partial = partial_path(destination);
        let copied = std::fs::copy(source, &partial)
            .and_then(|_| self.copy_metadata(source, &partial))
            .and_then(|_| publish(&partial, destination));
        let _ = std::fs::remove_file(&partial);
        copied
    }

    fn copy_metadata(&self, source: &Path, destination: &Path) -> io::Result<()> {
        let metadata = std::fs::metadata(source)?;
        std::fs::set_permissions(destination, metadata.permissions())?;
        filetime::set_file_times(
            destination,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )
    }
}

/// Makes `partial` visible at `destination`, failing with `AlreadyExists` if something is
/// already there. The partial file is left for the caller to remove.
fn publish(partial: &Path, destination: &Path) -> io::Result<()> {
    match std::fs::hard_link(partial, destination) {
        Err(e) if e.kind() == io::ErrorKind::Unsupported => {
            // FAT and exFAT have no hard links.
            if destination.symlink_metadata().is_ok() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{destination:?} already exists"),
                ));
            }
            std::fs::rename(partial, destination)
        }
        other => other,
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.partial"))
}

/// Carries out `operation`, or only reports it when `dry_run` is set.
pub fn perform_operation<F>(operation: &Operation, dry_run: bool, fs: &F) -> OperationResult
where
    F: FileOps + ?Sized,
{
    let outcome = match operation.kind {
        OperationKind::Copy if !dry_run => match operation.destination.parent() {
            Some(parent) => fs.create_dir_all(parent),
            None => Ok(()),
        }
        .and_then(|_| fs.copy_file(&operation.source, &operation.destination))
        .map_err(|e| (FailureKind::from_io(&e), e.to_string())),
        OperationKind::CopyStat if !dry_run => fs
            .copy_metadata(&operation.source, &operation.destination)
            .map_err(|e| (FailureKind::from_io(&e), e.to_string())),
        OperationKind::Copy | OperationKind::CopyStat | OperationKind::Identical => Ok(()),
        OperationKind::Unknown => Err((
            FailureKind::Unreconcilable,
            format!(
                "{} differs from {}; resolve manually",
                operation.destination.display(),
                operation.source.display()
            ),
        )),
    };

    match outcome {
        Ok(()) => {
            debug!(
                operation = %operation.kind,
                source = %operation.source.display(),
                destination = %operation.destination.display(),
                dry_run,
                "Operation performed"
            );
            OperationResult {
                operation: operation.clone(),
                success: true,
                error_kind: None,
                error: None,
                dry_run,
            }
        }
        Err((kind, message)) => {
            warn!(
                operation = %operation.kind,
                source = %operation.source.display(),
                destination = %operation.destination.display(),
                error_kind = %kind,
                error = %message,
                dry_run,
                "Operation failed"
            );
            OperationResult {
                operation: operation.clone(),
                success: false,
                error_kind: Some(kind),
                error: Some(message),
                dry_run,
            }
        }
    }
}
