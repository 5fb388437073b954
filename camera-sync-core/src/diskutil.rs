//! macOS `diskutil list -plist physical external` parsing.
//!
//! `diskutil` emits an XML property list. `plutil` converts it to JSON so the document can be
//! deserialised with serde_json like every other structured input in this crate.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::disks::Volume;
use crate::error::DiskListError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Partition {
    pub content: String,
    pub device_identifier: String,
    #[serde(rename = "DiskUUID", default)]
    pub disk_uuid: Option<String>,
    pub size: u64,
    #[serde(default)]
    pub volume_name: Option<String>,
    #[serde(rename = "VolumeUUID", default)]
    pub volume_uuid: Option<String>,
    #[serde(default)]
    pub mount_point: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskAndPartitions {
    pub content: String,
    pub device_identifier: String,
    #[serde(rename = "OSInternal", default)]
    pub os_internal: bool,
    #[serde(default)]
    pub partitions: Vec<Partition>,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiskutilList {
    #[serde(default)]
    pub all_disks: Vec<String>,
    pub all_disks_and_partitions: Vec<DiskAndPartitions>,
    #[serde(default)]
    pub volumes_from_disks: Vec<String>,
    #[serde(default)]
    pub whole_disks: Vec<String>,
}

/// Mounted partitions become volumes; unmounted ones (EFI, raw APFS containers) are dropped.
pub fn volumes_from_diskutil(listing: &DiskutilList) -> Vec<Volume> {
    let mut volumes = Vec::new();
    for disk in &listing.all_disks_and_partitions {
        for partition in &disk.partitions {
            let Some(mount_point) = &partition.mount_point else {
                debug!(device = %partition.device_identifier, "Skipping unmounted partition");
                continue;
            };
            let disk_size = Some(disk.size);
            let volume_size = Some(partition.size);
            let unique_identifier = match &partition.volume_uuid {
                Some(uuid) => uuid.to_lowercase(),
                None => Volume::synthetic_identifier(&partition.content, disk_size, volume_size),
            };
            volumes.push(Volume {
                mount_path: mount_point.clone(),
                unique_identifier,
                disk_size,
                volume_size,
                volume_name: partition.volume_name.clone(),
                volume_file_system: Some(partition.content.clone()),
            });
        }
    }
    volumes
}

/// Runs `diskutil` on the host and returns the parsed listing.
#[cfg(target_os = "macos")]
pub async fn list_physical_external_disks() -> Result<DiskutilList, DiskListError> {
    let value = list_physical_external_disks_json().await?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(not(target_os = "macos"))]
pub async fn list_physical_external_disks() -> Result<DiskutilList, DiskListError> {
    Err(DiskListError::UnsupportedPlatform(std::env::consts::OS))
}

/// The raw listing as untyped JSON, for display.
pub async fn list_physical_external_disks_json() -> Result<serde_json::Value, DiskListError> {
    if !cfg!(target_os = "macos") {
        return Err(DiskListError::UnsupportedPlatform(std::env::consts::OS));
    }

    let plist = run(
        Command::new("diskutil").args(["list", "-plist", "physical", "external"]),
        None,
    )
    .await?;
    let json = run(
        Command::new("plutil").args(["-convert", "json", "-o", "-", "-"]),
        Some(plist),
    )
    .await?;
    let value: serde_json::Value = serde_json::from_slice(&json)?;
    info!("Listed physical external disks with diskutil");
    Ok(value)
}

async fn run(command: &mut Command, stdin: Option<Vec<u8>>) -> Result<Vec<u8>, DiskListError> {
    let description = format!("{:?}", command.as_std());
    let command_error = |message: String| DiskListError::Command {
        command: description.clone(),
        message,
    };

    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|e| command_error(e.to_string()))?;

    // Feed stdin while draining stdout so neither pipe fills up.
    let pipe = child.stdin.take();
    let write = async move {
        if let (Some(mut pipe), Some(input)) = (pipe, stdin) {
            pipe.write_all(&input).await?;
        }
        Ok::<(), std::io::Error>(())
    };
    let (written, output) = tokio::join!(write, child.wait_with_output());
    written.map_err(|e| command_error(e.to_string()))?;
    let output = output.map_err(|e| command_error(e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(
            command = %description,
            status = ?output.status,
            %stderr,
            "Disk listing command failed"
        );
        return Err(command_error(format!("exited with {}: {}", output.status, stderr)));
    }
    Ok(output.stdout)
}
