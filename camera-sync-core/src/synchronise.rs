//! High-level pipeline: list volumes → match → enumerate → plan → execute → report.
//!
//! This module provides the top-level orchestration for "synchronising" every configured
//! camera source whose card is currently mounted:
//!   - Lists mounted volumes once via a [`DiskLister`]
//!   - Pairs volumes with syncs using [`filter_disks_to_syncs`]
//!   - Verifies every paired destination root before any file is touched
//!   - Enumerates each volume into file sets, plans them into dated folders and executes
//!     the resulting operations
//!   - Tallies every operation into [`Counters`] and returns a [`SyncReport`]
//!
//! # Error Handling
//! Ambiguous matches and unusable destinations abort the run before the first file
//! operation. An unsupported source type aborts only its own pair. Per-file failures are
//! counted and never stop the run.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Lower-level entrypoint for already matched pairs: [`synchronise_pairs`]
//! - Progress/reporting hook: [`SyncObserver`]

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{Config, SourceType};
use crate::destination::DatedFolderDestination;
use crate::disks::DiskLister;
use crate::error::SyncError;
use crate::filter_disks::{filter_disks_to_syncs, SyncPair};
use crate::operation::{perform_operation, FileOps, OperationKind, OperationResult};
use crate::source::enumerate_source_files;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Report what would happen without writing anything.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { dry_run: true }
    }
}

/// Running totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub copy: u64,
    pub copy_stat: u64,
    pub identical: u64,
    pub unknown: u64,
    pub success: u64,
    pub failure: u64,
    pub dry_run: u64,
}

impl Counters {
    fn record_planned(&mut self, kind: OperationKind) {
        match kind {
            OperationKind::Copy => self.copy += 1,
            OperationKind::CopyStat => self.copy_stat += 1,
            OperationKind::Identical => self.identical += 1,
            OperationKind::Unknown => self.unknown += 1,
        }
    }

    fn record_result(&mut self, result: &OperationResult) {
        if result.success {
            self.success += 1;
        } else {
            self.failure += 1;
        }
        if result.dry_run {
            self.dry_run += 1;
        }
    }

    fn merge(&mut self, other: &Counters) {
        self.copy += other.copy;
        self.copy_stat += other.copy_stat;
        self.identical += other.identical;
        self.unknown += other.unknown;
        self.success += other.success;
        self.failure += other.failure;
        self.dry_run += other.dry_run;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairReport {
    pub source_type: SourceType,
    pub mount_path: PathBuf,
    pub destination: PathBuf,
    pub file_sets: usize,
    pub counters: Counters,
    /// Set when the pair was abandoned before all of its files were processed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub pairs: Vec<PairReport>,
    pub counters: Counters,
}

/// Receives progress as a run advances. Every method defaults to doing nothing.
pub trait SyncObserver {
    fn pair_started(&mut self, _pair: &SyncPair, _file_sets: usize) {}
    fn file_set_finished(&mut self, _pair: &SyncPair) {}
    fn operation_finished(&mut self, _result: &OperationResult) {}
    fn pair_finished(&mut self, _report: &PairReport) {}
}

impl SyncObserver for () {}

/// Entrypoint: synchronise every mounted source in `config`.
pub async fn synchronise<L, F>(
    config: &Config,
    lister: &L,
    fs: &F,
    options: SyncOptions,
    observer: &mut dyn SyncObserver,
) -> Result<SyncReport, SyncError>
where
    L: DiskLister + ?Sized,
    F: FileOps + ?Sized,
{
    info!(
        syncs = config.syncs.len(),
        dry_run = options.dry_run,
        "[SYNC] Starting synchronisation"
    );

    let volumes = match lister.list_volumes().await {
        Ok(volumes) => volumes,
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Listing disks failed");
            return Err(e.into());
        }
    };
    info!(volumes = volumes.len(), "[SYNC] Listed volumes");

    let pairs = match filter_disks_to_syncs(&config.syncs, volumes) {
        Ok(pairs) => pairs,
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Ambiguous disk match");
            return Err(e.into());
        }
    };
    info!(pairs = pairs.len(), "[SYNC] Matched volumes to syncs");

    synchronise_pairs(&pairs, fs, options, observer)
}

/// Processes already matched pairs, one after another.
pub fn synchronise_pairs<F>(
    pairs: &[SyncPair],
    fs: &F,
    options: SyncOptions,
    observer: &mut dyn SyncObserver,
) -> Result<SyncReport, SyncError>
where
    F: FileOps + ?Sized,
{
    for pair in pairs {
        verify_destination(&pair.sync.destination.path, options.dry_run)?;
    }

    let mut report = SyncReport::default();
    for pair in pairs {
        let pair_report = synchronise_pair(pair, fs, options, observer);
        report.counters.merge(&pair_report.counters);
        observer.pair_finished(&pair_report);
        report.pairs.push(pair_report);
    }

    let c = &report.counters;
    info!(
        copy = c.copy,
        copy_stat = c.copy_stat,
        identical = c.identical,
        unknown = c.unknown,
        success = c.success,
        failure = c.failure,
        dry_run = c.dry_run,
        "counters"
    );
    Ok(report)
}

/// The destination root must be an existing directory the current user can write to.
///
/// A real run proves writability by creating and removing a temporary file. A dry run never
/// writes, so it only looks at the permission bits.
fn verify_destination(path: &Path, dry_run: bool) -> Result<(), SyncError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => metadata,
        _ => {
            error!(path = %path.display(), "[SYNC][ERROR] Destination missing");
            return Err(SyncError::MissingDestination {
                path: path.to_path_buf(),
            });
        }
    };

    let writable = if dry_run {
        !metadata.permissions().readonly()
    } else {
        match tempfile::NamedTempFile::new_in(path) {
            Ok(_) => true,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Destination write check failed");
                false
            }
        }
    };

    if !writable {
        error!(path = %path.display(), "[SYNC][ERROR] Destination is read-only");
        return Err(SyncError::ReadOnlyDestination {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn synchronise_pair<F>(
    pair: &SyncPair,
    fs: &F,
    options: SyncOptions,
    observer: &mut dyn SyncObserver,
) -> PairReport
where
    F: FileOps + ?Sized,
{
    let source_type = pair.sync.source.source_type;
    let mut report = PairReport {
        source_type,
        mount_path: pair.volume.mount_path.clone(),
        destination: pair.sync.destination.path.clone(),
        file_sets: 0,
        counters: Counters::default(),
        error: None,
    };
    info!(
        %source_type,
        mount_path = %report.mount_path.display(),
        destination = %report.destination.display(),
        "[SYNC] Starting pair"
    );

    let file_sets = match enumerate_source_files(&pair.volume, source_type) {
        Ok(file_sets) => file_sets,
        Err(e) => {
            error!(%source_type, error = %e, "[SYNC][ERROR] Enumeration failed");
            report.counters.failure += 1;
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.file_sets = file_sets.len();
    observer.pair_started(pair, file_sets.len());

    let destination = DatedFolderDestination::new(&pair.sync.destination.path);
    for file_set in &file_sets {
        debug!(
            stem = %file_set.stem,
            prefix = %file_set.prefix.display(),
            files = file_set.files.len(),
            "[SYNC] file_set"
        );
        let operations = match destination.generate_operations(file_set) {
            Ok(operations) => operations,
            Err(e) => {
                // The set could not be dated or compared; count each file as failed.
                error!(stem = %file_set.stem, error = %e, "[SYNC][ERROR] Planning failed");
                report.counters.failure += file_set.files.len() as u64;
                observer.file_set_finished(pair);
                continue;
            }
        };

        for operation in &operations {
            report.counters.record_planned(operation.kind);
            let result = perform_operation(operation, options.dry_run, fs);
            if !result.success {
                info!(
                    source = %operation.source.display(),
                    error_kind = result.error_kind.map(|k| k.as_str()).unwrap_or("-"),
                    error = result.error.as_deref().unwrap_or("-"),
                    "perform_operation error"
                );
            }
            report.counters.record_result(&result);
            observer.operation_finished(&result);
        }
        observer.file_set_finished(pair);
    }

    info!(
        %source_type,
        file_sets = report.file_sets,
        failure = report.counters.failure,
        "[SYNC] Pair complete"
    );
    report
}
