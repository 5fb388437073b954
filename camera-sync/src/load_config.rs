/// `load_config` module: reads the YAML sync configuration into the core [`Config`].
///
/// This is the only place YAML is parsed. Everything past this point works on typed
/// structs from `camera-sync-core`.
///
/// # Errors
/// Unreadable files, malformed YAML, unknown source or criterion tags, and configurations
/// that fail [`Config::validate`] are all returned as `anyhow::Error` with the config path
/// in the message, and logged before returning.
use anyhow::Result;
use camera_sync_core::config::{
    Config, Destination, MatchCriterion, SourceConfig, SourceType, SyncConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "CAMERA_SYNC_CONFIG";

/// Loads and validates a sync configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: Config = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Err(e) = config.validate() {
        error!(error = %e, config_path = ?path_ref, "Config failed validation");
        return Err(anyhow::anyhow!("Invalid config {:?}: {}", path_ref, e));
    }

    config.trace_loaded();
    Ok(config)
}

/// An example configuration covering the common ways of recognising a card.
pub fn sample_config() -> Config {
    let cameras = PathBuf::from("/Volumes/Cameras");
    Config {
        syncs: vec![
            SyncConfig {
                source: SourceConfig {
                    source_type: SourceType::DjiMini3Pro,
                    identifier: Some("3a8c3713-c262-3db7-8bec-604865b64393".to_string()),
                    disk_size: Some(125_829_120_000),
                    volume_size: Some(125_795_565_568),
                    volume_name: Some("DJI Mini 3".to_string()),
                    volume_file_system: Some("Windows_FAT_32".to_string()),
                    match_on: MatchCriterion::ALL.to_vec(),
                },
                destination: Destination {
                    path: cameras.join("DJI Mini 3 Pro"),
                },
            },
            SyncConfig {
                source: SourceConfig {
                    source_type: SourceType::GoPro10,
                    identifier: Some("Windows_FAT_32-63864569856-63847792640".to_string()),
                    disk_size: Some(63_864_569_856),
                    volume_size: None,
                    volume_name: None,
                    volume_file_system: None,
                    match_on: vec![MatchCriterion::Identifier, MatchCriterion::DiskSize],
                },
                destination: Destination {
                    path: cameras.join("GoPro 10"),
                },
            },
            SyncConfig {
                source: SourceConfig::with_identifier(
                    SourceType::SonyA7Iv,
                    "c1a0c5a6-2b0e-3f43-9a1c-0c2b1f2a6e11",
                ),
                destination: Destination {
                    path: cameras.join("Sony A7 IV"),
                },
            },
        ],
    }
}

pub fn sample_config_yaml() -> Result<String> {
    serde_yaml::to_string(&sample_config())
        .map_err(|e| anyhow::anyhow!("Failed to serialise sample config: {e}"))
}
