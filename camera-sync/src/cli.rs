///
/// This module implements the CLI interface for camera-sync: command parsing, argument
/// validation, and the async entrypoint shared by `main` and the integration tests.
///
/// All decision logic (disk matching, card layouts, planning, copying) lives in the
/// [`camera-sync-core`] crate. This module wires it to files, stdout and the terminal.
///
/// ## How To Use
/// - For command-line users: run the `camera-sync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// Commands that print data (`diskutil-list`, `list-disks`, `preview`, `sync`) write JSON to
/// stdout; logs and progress bars go to stderr.
///
/// [`camera-sync-core`]: ../../camera_sync_core/
use crate::load_config::{load_config, sample_config_yaml};
use crate::progress::ProgressObserver;
use anyhow::Result;
use camera_sync_core::disks::{DiskLister, DiskutilLister, FixtureLister};
use camera_sync_core::diskutil;
use camera_sync_core::filter_disks::filter_disks_to_syncs;
use camera_sync_core::operation::StdFileOps;
use camera_sync_core::synchronise::{synchronise, SyncOptions};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// CLI for camera-sync: copy new media off attached camera cards.
#[derive(Parser)]
#[clap(
    name = "camera-sync",
    version,
    about = "Copy new media from attached camera cards into dated destination folders"
)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    pub json_logs: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the raw listing of external physical disks as JSON
    DiskutilList,

    /// Print every mounted external volume, one JSON object per line
    ListDisks {
        /// Read a captured disk listing (JSON) instead of querying the host
        #[clap(long)]
        input: Option<PathBuf>,
    },

    /// Print an example YAML configuration
    SampleConfig,

    /// Show which configured sources match the mounted volumes
    Preview {
        /// Path to the YAML config file
        #[clap(long, env = "CAMERA_SYNC_CONFIG")]
        config: PathBuf,

        /// Read a captured disk listing (JSON) instead of querying the host
        #[clap(long)]
        input: Option<PathBuf>,
    },

    /// Copy new files from every matched card into its destination
    Sync {
        /// Path to the YAML config file
        #[clap(long, env = "CAMERA_SYNC_CONFIG")]
        config: PathBuf,

        /// Read a captured disk listing (JSON) instead of querying the host
        #[clap(long)]
        input: Option<PathBuf>,

        /// Actually copy files; without this flag only the plan is reported
        #[clap(long)]
        no_dry_run: bool,
    },
}

/// One matched pair as printed by `preview`.
#[derive(Debug, Serialize)]
struct PreviewLine<'a> {
    source_type: String,
    mount_path: &'a Path,
    unique_identifier: &'a str,
    destination: &'a Path,
}

fn disk_lister(input: Option<PathBuf>) -> Box<dyn DiskLister> {
    match input {
        Some(path) => {
            tracing::info!(input = ?path, "Using captured disk listing");
            Box::new(FixtureLister::new(path))
        }
        None => Box::new(DiskutilLister),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::DiskutilList => {
            let listing = diskutil::list_physical_external_disks_json().await?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
        Commands::ListDisks { input } => {
            let volumes = disk_lister(input).list_volumes().await?;
            tracing::info!(command = "list-disks", volumes = volumes.len(), "Listed volumes");
            for volume in &volumes {
                println!("{}", serde_json::to_string(volume)?);
            }
            Ok(())
        }
        Commands::SampleConfig => {
            print!("{}", sample_config_yaml()?);
            Ok(())
        }
        Commands::Preview { config, input } => {
            let config = load_config(config)?;
            let volumes = disk_lister(input).list_volumes().await?;
            let pairs = filter_disks_to_syncs(&config.syncs, volumes)?;
            tracing::info!(command = "preview", pairs = pairs.len(), "Matched volumes");
            for pair in &pairs {
                let line = PreviewLine {
                    source_type: pair.sync.source.source_type.to_string(),
                    mount_path: &pair.volume.mount_path,
                    unique_identifier: &pair.volume.unique_identifier,
                    destination: &pair.sync.destination.path,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
            Ok(())
        }
        Commands::Sync {
            config,
            input,
            no_dry_run,
        } => {
            let config = load_config(config)?;
            let lister = disk_lister(input);
            let options = SyncOptions {
                dry_run: !no_dry_run,
            };
            tracing::info!(
                command = "sync",
                dry_run = options.dry_run,
                "Starting synchronisation process"
            );

            let mut progress = if cli.json_logs {
                ProgressObserver::hidden()
            } else {
                ProgressObserver::new()
            };
            let outcome =
                synchronise(&config, lister.as_ref(), &StdFileOps, options, &mut progress).await;
            match outcome {
                Ok(report) => {
                    tracing::info!(
                        command = "sync",
                        failures = report.counters.failure,
                        "Synchronisation complete"
                    );
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
