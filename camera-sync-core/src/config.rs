use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::disks::Volume;
use crate::error::ConfigError;

/// Camera or recorder kinds with a known card layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    DjiMini3Pro,
    DjiOsmoPocket,
    SonyA7Iv,
    Insta360Go2,
    Insta360One,
    #[serde(rename = "gopro_10")]
    GoPro10,
    FujifilmX100,
    AtomosNinja,
    AtemIso,
    Unknown,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::DjiMini3Pro => "dji_mini_3_pro",
            SourceType::DjiOsmoPocket => "dji_osmo_pocket",
            SourceType::SonyA7Iv => "sony_a7_iv",
            SourceType::Insta360Go2 => "insta360_go_2",
            SourceType::Insta360One => "insta360_one",
            SourceType::GoPro10 => "gopro_10",
            SourceType::FujifilmX100 => "fujifilm_x100",
            SourceType::AtomosNinja => "atomos_ninja",
            SourceType::AtemIso => "atem_iso",
            SourceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A volume attribute that must agree for a source to claim the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCriterion {
    Identifier,
    DiskSize,
    VolumeSize,
    VolumeFileSystem,
}

impl MatchCriterion {
    pub const ALL: [MatchCriterion; 4] = [
        MatchCriterion::Identifier,
        MatchCriterion::DiskSize,
        MatchCriterion::VolumeSize,
        MatchCriterion::VolumeFileSystem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchCriterion::Identifier => "identifier",
            MatchCriterion::DiskSize => "disk_size",
            MatchCriterion::VolumeSize => "volume_size",
            MatchCriterion::VolumeFileSystem => "volume_file_system",
        }
    }

    /// A criterion the source does not set never matches.
    pub fn matches(&self, source: &SourceConfig, volume: &Volume) -> bool {
        match self {
            MatchCriterion::Identifier => source
                .identifier
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(&volume.unique_identifier)),
            MatchCriterion::DiskSize => {
                source.disk_size.is_some() && source.disk_size == volume.disk_size
            }
            MatchCriterion::VolumeSize => {
                source.volume_size.is_some() && source.volume_size == volume.volume_size
            }
            MatchCriterion::VolumeFileSystem => {
                source.volume_file_system.is_some()
                    && source.volume_file_system == volume.volume_file_system
            }
        }
    }

    fn is_set_on(&self, source: &SourceConfig) -> bool {
        match self {
            MatchCriterion::Identifier => source.identifier.is_some(),
            MatchCriterion::DiskSize => source.disk_size.is_some(),
            MatchCriterion::VolumeSize => source.volume_size.is_some(),
            MatchCriterion::VolumeFileSystem => source.volume_file_system.is_some(),
        }
    }

    /// Normalised value of this attribute on a source, for distinguishability checks.
    fn key_on(&self, source: &SourceConfig) -> Option<String> {
        match self {
            MatchCriterion::Identifier => source.identifier.as_ref().map(|i| i.to_lowercase()),
            MatchCriterion::DiskSize => source.disk_size.map(|s| s.to_string()),
            MatchCriterion::VolumeSize => source.volume_size.map(|s| s.to_string()),
            MatchCriterion::VolumeFileSystem => source.volume_file_system.clone(),
        }
    }
}

fn default_match_on() -> Vec<MatchCriterion> {
    MatchCriterion::ALL.to_vec()
}

/// How to recognise one camera's volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_file_system: Option<String>,
    /// Evaluated in order; the first failing criterion rejects the volume.
    #[serde(default = "default_match_on")]
    pub match_on: Vec<MatchCriterion>,
}

impl SourceConfig {
    /// A source keyed on its volume UUID only.
    pub fn with_identifier(source_type: SourceType, identifier: impl Into<String>) -> Self {
        Self {
            source_type,
            identifier: Some(identifier.into()),
            disk_size: None,
            volume_size: None,
            volume_name: None,
            volume_file_system: None,
            match_on: vec![MatchCriterion::Identifier],
        }
    }

    /// Returns the first listed criterion the volume fails, if any.
    pub fn first_mismatch(&self, volume: &Volume) -> Option<MatchCriterion> {
        self.match_on
            .iter()
            .copied()
            .find(|criterion| !criterion.matches(self, volume))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub path: PathBuf,
}

/// One source paired with where its files go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: SourceConfig,
    pub destination: Destination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub syncs: Vec<SyncConfig>,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(syncs_count = self.syncs.len(), "Loaded Config");
        for sync in &self.syncs {
            info!(
                source_type = %sync.source.source_type,
                identifier = sync.source.identifier.as_deref().unwrap_or("-"),
                destination = %sync.destination.path.display(),
                "Loaded sync"
            );
        }
        debug!(?self, "Config loaded (full debug)");
    }

    /// Rejects sources that could never match, or that could never be told apart.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (sync_index, sync) in self.syncs.iter().enumerate() {
            let source = &sync.source;
            if source.match_on.is_empty() {
                return Err(ConfigError::NoCriteria { sync_index });
            }
            if let Some(missing) = source.match_on.iter().find(|c| !c.is_set_on(source)) {
                return Err(ConfigError::MissingAttribute {
                    sync_index,
                    criterion: missing.as_str(),
                });
            }
        }

        for (first, a) in self.syncs.iter().enumerate() {
            for (offset, b) in self.syncs[first + 1..].iter().enumerate() {
                if fingerprint(&a.source) == fingerprint(&b.source) {
                    return Err(ConfigError::Indistinguishable {
                        first,
                        second: first + 1 + offset,
                    });
                }
            }
        }
        Ok(())
    }
}

fn fingerprint(source: &SourceConfig) -> Vec<(MatchCriterion, Option<String>)> {
    MatchCriterion::ALL
        .iter()
        .filter(|c| source.match_on.contains(*c))
        .map(|c| (*c, c.key_on(source)))
        .collect()
}
