//! Card layouts: which files a camera writes, and how they group into shots.
//!
//! Every supported [`SourceType`] maps to a fixed set of scan patterns relative to the volume
//! root plus a rule for deriving the grouping key. Files sharing a key within one directory
//! form a [`FileSet`]. Output is ordered by `(prefix, stem)` so repeated walks of the same
//! card agree.
//!
//! Layouts observed on real cards:
//!
//! | camera | example |
//! |---|---|
//! | DJI Mini 3 Pro | `DCIM/100MEDIA/DJI_0027.{MP4,JPG,DNG,SRT}` |
//! | DJI Osmo Pocket | `DCIM/100MEDIA/DJI_0020.MOV`, `DCIM/PANORAMA/100_0018/DJI_0001.JPG` |
//! | Sony A7 IV | `DCIM/10030620/A7401412.{ARW,HIF}`, `M4ROOT/CLIP/C0109.MP4` + `C0109M01.XML` |
//! | Insta360 | `DCIM/Camera01/VID_20171222_153701_058.insv` |
//! | GoPro 10 | `DCIM/100GOPRO/GX010265.MP4`, `GL010265.LRV`, `GX010265.THM` |
//! | Fujifilm X100 | `DCIM/100_FUJI/DSCF0384.{JPG,RAF}` |
//! | Atomos | `SHOGUN_S001_S001_T001.MOV` at the volume root |
//! | ATEM ISO | `<project>/<project>.drp`, `<project>/Video ISO Files/*.mp4`, ... |

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::{glob_with, MatchOptions, Pattern};
use regex::Regex;
use tracing::{debug, info, trace, warn};

use crate::config::SourceType;
use crate::disks::Volume;
use crate::error::SourceError;
use crate::file::{File, FileSet};

/// Sony writes clip metadata as `C0109M01.XML` next to `C0109.MP4`.
static SONY_CLIP_SIDECAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?P<clip>.+)M01$").expect("static regex"));

/// macOS AppleDouble files (`._NAME`) shadow real files on non-HFS volumes.
const APPLE_DOUBLE: &str = "._";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKey {
    /// File name without its extension.
    Stem,
    /// Name of the directory holding the file.
    ParentDir,
    /// Last `n` characters of the stem.
    TrailingSerial(usize),
    /// Stem, with a trailing `M01` stripped from XML sidecars.
    ClipSidecar,
}

impl GroupKey {
    fn derive(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self {
            GroupKey::Stem => stem,
            GroupKey::ParentDir => path
                .parent()
                .and_then(Path::file_name)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(stem),
            GroupKey::TrailingSerial(n) => {
                let count = stem.chars().count();
                stem.chars().skip(count.saturating_sub(*n)).collect()
            }
            GroupKey::ClipSidecar => {
                let is_xml = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
                match SONY_CLIP_SIDECAR.captures(&stem) {
                    Some(caps) if is_xml => caps["clip"].to_string(),
                    _ => stem,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScanRoot {
    pattern: &'static str,
    key: GroupKey,
    /// Only accept files whose extension has exactly this many characters.
    extension_len: Option<usize>,
}

impl ScanRoot {
    const fn new(pattern: &'static str, key: GroupKey) -> Self {
        Self {
            pattern,
            key,
            extension_len: None,
        }
    }

    const fn extension_len(mut self, len: usize) -> Self {
        self.extension_len = Some(len);
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        match self.extension_len {
            None => true,
            Some(len) => path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().chars().count() == len),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LayoutRule {
    roots: &'static [ScanRoot],
    /// File names starting with any of these are ignored.
    exclude_prefixes: &'static [&'static str],
}

impl LayoutRule {
    fn excludes(&self, path: &Path) -> bool {
        excluded(path, self.exclude_prefixes)
    }
}

fn excluded(path: &Path, prefixes: &[&str]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    prefixes.iter().any(|prefix| name.starts_with(prefix))
}

use GroupKey::{ClipSidecar, ParentDir, Stem, TrailingSerial};

const DJI_MINI_3_PRO: LayoutRule = LayoutRule {
    roots: &[ScanRoot::new("DCIM/100MEDIA/DJI_*", Stem)],
    exclude_prefixes: &[],
};

const DJI_OSMO_POCKET: LayoutRule = LayoutRule {
    roots: &[
        ScanRoot::new("DCIM/100MEDIA/DJI_*", Stem),
        ScanRoot::new("DCIM/PANORAMA/*/DJI_*", ParentDir),
    ],
    exclude_prefixes: &[],
};

const SONY_A7_IV: LayoutRule = LayoutRule {
    roots: &[
        ScanRoot::new("DCIM/**/*", Stem).extension_len(3),
        ScanRoot::new("M4ROOT/CLIP/C*", ClipSidecar),
        ScanRoot::new("private/M4ROOT/CLIP/C*", ClipSidecar),
    ],
    exclude_prefixes: &[],
};

const INSTA360_GO_2: LayoutRule = LayoutRule {
    roots: &[ScanRoot::new("DCIM/Camera01/*", Stem)],
    exclude_prefixes: &[],
};

const INSTA360_ONE: LayoutRule = LayoutRule {
    roots: &[ScanRoot::new("DCIM/Camera01/*", Stem)],
    exclude_prefixes: &[APPLE_DOUBLE],
};

// Chapters and low-res proxies share the last four digits: GX010265, GL010265.
const GOPRO_10: LayoutRule = LayoutRule {
    roots: &[ScanRoot::new("DCIM/100GOPRO/G*", TrailingSerial(4))],
    exclude_prefixes: &[APPLE_DOUBLE],
};

const FUJIFILM_X100: LayoutRule = LayoutRule {
    roots: &[ScanRoot::new("DCIM/100_FUJI/*", Stem)],
    exclude_prefixes: &[APPLE_DOUBLE],
};

const ATOMOS_NINJA: LayoutRule = LayoutRule {
    roots: &[ScanRoot::new("*", Stem)],
    exclude_prefixes: &[".", "Frame Grab"],
};

fn layout_rule(source_type: SourceType) -> Option<&'static LayoutRule> {
    match source_type {
        SourceType::DjiMini3Pro => Some(&DJI_MINI_3_PRO),
        SourceType::DjiOsmoPocket => Some(&DJI_OSMO_POCKET),
        SourceType::SonyA7Iv => Some(&SONY_A7_IV),
        SourceType::Insta360Go2 => Some(&INSTA360_GO_2),
        SourceType::Insta360One => Some(&INSTA360_ONE),
        SourceType::GoPro10 => Some(&GOPRO_10),
        SourceType::FujifilmX100 => Some(&FUJIFILM_X100),
        SourceType::AtomosNinja => Some(&ATOMOS_NINJA),
        SourceType::AtemIso | SourceType::Unknown => None,
    }
}

/// Files an ATEM ISO recorder writes per project, relative to the project folder.
const ATEM_PROJECT_FILES: &[&str] = &[
    "*.mp4",
    "*.drp",
    "Video ISO Files/*.mp4",
    "Video ISO Files/Media Files/*",
    "Audio Source Files/*.wav",
];

/// Walks `volume` using the layout of `source_type` and groups its files into shots.
pub fn enumerate_source_files(
    volume: &Volume,
    source_type: SourceType,
) -> Result<Vec<FileSet>, SourceError> {
    info!(
        %source_type,
        mount_path = %volume.mount_path.display(),
        "Enumerating source files"
    );

    let file_sets = match (source_type, layout_rule(source_type)) {
        (_, Some(rule)) => enumerate_with_rule(volume, rule)?,
        (SourceType::AtemIso, None) => enumerate_atem_projects(volume)?,
        (other, None) => return Err(SourceError::Unsupported(other)),
    };

    debug!(%source_type, file_sets = file_sets.len(), "Enumerated file sets");
    Ok(file_sets)
}

fn enumerate_with_rule(volume: &Volume, rule: &LayoutRule) -> Result<Vec<FileSet>, SourceError> {
    let mut by_key: BTreeMap<(PathBuf, String), FileSet> = BTreeMap::new();

    for root in rule.roots {
        for path in glob_files(&volume.mount_path, root.pattern)? {
            if rule.excludes(&path) || !root.accepts(&path) {
                trace!(path = %path.display(), "Skipping file");
                continue;
            }
            let Some(prefix) = prefix_of(volume, &path) else {
                continue;
            };
            let stem = root.key.derive(&path);
            by_key
                .entry((prefix.clone(), stem.clone()))
                .or_insert_with(|| new_file_set(volume, stem, prefix))
                .files
                .push(File::new(path));
        }
    }

    Ok(by_key.into_values().collect())
}

/// One set per project folder holding a `.drp`, keyed by the folder name.
fn enumerate_atem_projects(volume: &Volume) -> Result<Vec<FileSet>, SourceError> {
    let mut projects = BTreeSet::new();
    for drp in glob_files(&volume.mount_path, "*/*.drp")? {
        if excluded(&drp, &[APPLE_DOUBLE]) {
            continue;
        }
        if let Some(project) = drp.parent() {
            projects.insert(project.to_path_buf());
        }
    }

    let mut file_sets = Vec::with_capacity(projects.len());
    for project in projects {
        let Some(prefix) = project
            .strip_prefix(&volume.mount_path)
            .ok()
            .map(Path::to_path_buf)
        else {
            continue;
        };
        let stem = project
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut file_set = new_file_set(volume, stem, prefix);
        for pattern in ATEM_PROJECT_FILES {
            for path in glob_files(&project, pattern)? {
                if !excluded(&path, &[APPLE_DOUBLE]) {
                    file_set.files.push(File::new(path));
                }
            }
        }
        file_sets.push(file_set);
    }
    Ok(file_sets)
}

fn new_file_set(volume: &Volume, stem: String, prefix: PathBuf) -> FileSet {
    FileSet {
        files: Vec::new(),
        stem,
        prefix,
        volume_path: volume.mount_path.clone(),
        volume_identifier: volume.unique_identifier.clone(),
    }
}

fn prefix_of(volume: &Volume, path: &Path) -> Option<PathBuf> {
    path.parent()?
        .strip_prefix(&volume.mount_path)
        .ok()
        .map(Path::to_path_buf)
}

/// Regular files under `base` matching `pattern`, in sorted order.
fn glob_files(base: &Path, pattern: &str) -> Result<Vec<PathBuf>, SourceError> {
    let base_str = base.to_str().ok_or_else(|| SourceError::Pattern {
        pattern: pattern.to_string(),
        message: format!("{base:?} is not valid UTF-8"),
    })?;
    let full = format!("{}/{}", Pattern::escape(base_str), pattern);

    let entries = glob_with(&full, MatchOptions::new()).map_err(|e| SourceError::Pattern {
        pattern: full.clone(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            // Volumes carry folders the user cannot read (`.Trashes`, `.Spotlight-V100`).
            Err(e) => {
                let path = e.path().to_path_buf();
                let error = std::io::Error::from(e);
                warn!(path = %path.display(), error = %error, "Skipping unreadable entry");
            }
        }
    }
    Ok(files)
}
