//! Mounted volumes and the seam through which they are discovered.
//!
//! A [`Volume`] is a plain value built fresh on every listing. How the listing is obtained
//! (a native tool, a captured fixture, a mock) is hidden behind [`DiskLister`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::diskutil::{self, DiskutilList};
use crate::error::DiskListError;

/// A mounted filesystem on an external disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub mount_path: PathBuf,
    /// Lower-cased volume UUID, or `{file_system}-{disk_size}-{volume_size}` when the volume
    /// has none (common on FAT32 cards).
    pub unique_identifier: String,
    #[serde(default)]
    pub disk_size: Option<u64>,
    #[serde(default)]
    pub volume_size: Option<u64>,
    #[serde(default)]
    pub volume_name: Option<String>,
    #[serde(default)]
    pub volume_file_system: Option<String>,
}

impl Volume {
    /// Identifier for a volume that reports no UUID.
    pub fn synthetic_identifier(
        file_system: &str,
        disk_size: Option<u64>,
        volume_size: Option<u64>,
    ) -> String {
        let size = |s: Option<u64>| s.map(|v| v.to_string()).unwrap_or_else(|| "unknown".into());
        format!("{}-{}-{}", file_system, size(disk_size), size(volume_size))
    }
}

/// Lists the volumes currently mounted from external physical disks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DiskLister: Send + Sync {
    async fn list_volumes(&self) -> Result<Vec<Volume>, DiskListError>;
}

/// Queries the running host with `diskutil`. Only macOS is supported.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskutilLister;

#[async_trait]
impl DiskLister for DiskutilLister {
    async fn list_volumes(&self) -> Result<Vec<Volume>, DiskListError> {
        let listing = diskutil::list_physical_external_disks().await?;
        Ok(diskutil::volumes_from_diskutil(&listing))
    }
}

/// Replays a previously captured `diskutil` listing (converted to JSON) from a file.
#[derive(Debug, Clone)]
pub struct FixtureLister {
    path: PathBuf,
}

impl FixtureLister {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DiskLister for FixtureLister {
    async fn list_volumes(&self) -> Result<Vec<Volume>, DiskListError> {
        let raw = std::fs::read(&self.path)?;
        let listing: DiskutilList = serde_json::from_slice(&raw)?;
        Ok(diskutil::volumes_from_diskutil(&listing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_identifier_joins_filesystem_and_sizes() {
        assert_eq!(
            Volume::synthetic_identifier("Windows_FAT_32", Some(15931539456), Some(15927345152)),
            "Windows_FAT_32-15931539456-15927345152"
        );
        assert_eq!(
            Volume::synthetic_identifier("ExFAT", None, Some(10)),
            "ExFAT-unknown-10"
        );
    }
}
