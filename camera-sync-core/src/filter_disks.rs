//! Pairs configured sources with mounted volumes.
//!
//! Volume UUIDs are not reliably unique: cards from the same vendor (or formatted by the same
//! camera) can share one. Each source therefore lists the attributes it must agree on, and a
//! pairing is only accepted when it is one-to-one in both directions.

use std::collections::HashMap;

use tracing::debug;

use crate::config::SyncConfig;
use crate::disks::Volume;
use crate::error::MatchError;

/// A source together with the volume it claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPair {
    pub sync: SyncConfig,
    pub volume: Volume,
}

/// Finds at most one volume per sync and at most one sync per volume.
///
/// Syncs without a matching volume are skipped (the camera is not plugged in). A sync that
/// matches more than one volume, or a volume claimed by more than one sync, is an error: the
/// configuration cannot tell them apart and guessing could send files to the wrong place.
pub fn filter_disks_to_syncs<I>(
    syncs: &[SyncConfig],
    volumes: I,
) -> Result<Vec<SyncPair>, MatchError>
where
    I: IntoIterator<Item = Volume>,
{
    // Every sync inspects every volume, so the input is only walked once.
    let volumes: Vec<Volume> = volumes.into_iter().collect();
    debug!(syncs = syncs.len(), volumes = volumes.len(), "Matching volumes to syncs");

    let mut claimed_by: HashMap<usize, usize> = HashMap::new();
    let mut pairs = Vec::new();

    for (sync_index, sync) in syncs.iter().enumerate() {
        let candidates: Vec<usize> = volumes
            .iter()
            .enumerate()
            .filter(|(_, volume)| match sync.source.first_mismatch(volume) {
                None => {
                    debug!(
                        sync_index,
                        mount_path = %volume.mount_path.display(),
                        "Matched candidate"
                    );
                    true
                }
                Some(criterion) => {
                    debug!(
                        sync_index,
                        mount_path = %volume.mount_path.display(),
                        property = criterion.as_str(),
                        "Mismatch"
                    );
                    false
                }
            })
            .map(|(volume_index, _)| volume_index)
            .collect();

        let volume_index = match candidates.as_slice() {
            [] => {
                debug!(sync_index, source_type = %sync.source.source_type, "No volume for sync");
                continue;
            }
            [only] => *only,
            many => {
                return Err(MatchError::Ambiguous {
                    sync_index,
                    source_type: sync.source.source_type,
                    mount_paths: many
                        .iter()
                        .map(|i| volumes[*i].mount_path.clone())
                        .collect(),
                })
            }
        };

        if let Some(first) = claimed_by.insert(volume_index, sync_index) {
            return Err(MatchError::DuplicateVolume {
                mount_path: volumes[volume_index].mount_path.clone(),
                first,
                second: sync_index,
            });
        }
        pairs.push(SyncPair {
            sync: sync.clone(),
            volume: volumes[volume_index].clone(),
        });
    }

    Ok(pairs)
}
