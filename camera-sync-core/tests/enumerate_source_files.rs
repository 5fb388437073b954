// Integration tests for card layout enumeration.
// Each test builds a fake card in a temp dir and checks how its files are grouped.

use camera_sync_core::config::SourceType;
use camera_sync_core::disks::Volume;
use camera_sync_core::file::{File, FileSet};
use camera_sync_core::source::enumerate_source_files;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn card() -> (TempDir, Volume) {
    let dir = tempfile::tempdir().expect("temp dir");
    let volume = Volume {
        mount_path: dir.path().to_path_buf(),
        unique_identifier: "abc".to_string(),
        disk_size: None,
        volume_size: None,
        volume_name: None,
        volume_file_system: None,
    };
    (dir, volume)
}

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

fn file_set(volume: &Volume, stem: &str, prefix: &str, files: &[&str]) -> FileSet {
    FileSet {
        files: files
            .iter()
            .map(|f| File::new(volume.mount_path.join(f)))
            .collect(),
        stem: stem.to_string(),
        prefix: PathBuf::from(prefix),
        volume_path: volume.mount_path.clone(),
        volume_identifier: volume.unique_identifier.clone(),
    }
}

/// Sorted so comparisons do not depend on walk order.
fn enumerate_sorted(volume: &Volume, source_type: SourceType) -> Vec<FileSet> {
    let mut sets = enumerate_source_files(volume, source_type).expect("enumeration succeeds");
    for set in &mut sets {
        set.files.sort();
    }
    sets.sort_by(|a, b| (&a.prefix, &a.stem).cmp(&(&b.prefix, &b.stem)));
    sets
}

#[test]
fn dji_mini_3_pro_groups_video_and_subtitles() {
    let (_dir, volume) = card();
    touch(&volume.mount_path, "DCIM/100MEDIA/DJI_0123.MP4");
    touch(&volume.mount_path, "DCIM/100MEDIA/DJI_0123.SRT");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::DjiMini3Pro),
        vec![file_set(
            &volume,
            "DJI_0123",
            "DCIM/100MEDIA",
            &["DCIM/100MEDIA/DJI_0123.MP4", "DCIM/100MEDIA/DJI_0123.SRT"],
        )]
    );
}

#[test]
fn dji_osmo_pocket_groups_panoramas_by_folder() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "DCIM/100MEDIA/DJI_0018.html");
    touch(root, "DCIM/100MEDIA/DJI_0019.JPG");
    touch(root, "DCIM/100MEDIA/DJI_0020.MOV");
    touch(root, "DCIM/100MEDIA/._DJI_0235.MOV");
    touch(root, "DCIM/100MEDIA/DJI_0241.MP4");
    touch(root, "DCIM/PANORAMA/100_0018/DJI_0001.JPG");
    touch(root, "DCIM/PANORAMA/100_0018/DJI_0002.JPG");
    touch(root, "DCIM/PANORAMA/100_0019/DJI_0001.JPG");
    touch(root, "DCIM/PANORAMA/100_0019/DJI_0002.JPG");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::DjiOsmoPocket),
        vec![
            file_set(&volume, "DJI_0018", "DCIM/100MEDIA", &["DCIM/100MEDIA/DJI_0018.html"]),
            file_set(&volume, "DJI_0019", "DCIM/100MEDIA", &["DCIM/100MEDIA/DJI_0019.JPG"]),
            file_set(&volume, "DJI_0020", "DCIM/100MEDIA", &["DCIM/100MEDIA/DJI_0020.MOV"]),
            file_set(&volume, "DJI_0241", "DCIM/100MEDIA", &["DCIM/100MEDIA/DJI_0241.MP4"]),
            file_set(
                &volume,
                "100_0018",
                "DCIM/PANORAMA/100_0018",
                &[
                    "DCIM/PANORAMA/100_0018/DJI_0001.JPG",
                    "DCIM/PANORAMA/100_0018/DJI_0002.JPG",
                ],
            ),
            file_set(
                &volume,
                "100_0019",
                "DCIM/PANORAMA/100_0019",
                &[
                    "DCIM/PANORAMA/100_0019/DJI_0001.JPG",
                    "DCIM/PANORAMA/100_0019/DJI_0002.JPG",
                ],
            ),
        ]
    );
}

#[test]
fn sony_a7_iv_groups_stills_and_clip_sidecars() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "DCIM/10030620/A7401412.HIF");
    touch(root, "DCIM/10030620/A7401412.ARW");
    touch(root, "DCIM/10030620/INDEX.DATA");
    touch(root, "M4ROOT/CLIP/C0109M01.XML");
    touch(root, "M4ROOT/CLIP/C0109.MP4");
    touch(root, "private/M4ROOT/CLIP/C0200.MP4");
    touch(root, "private/M4ROOT/CLIP/C0200M01.XML");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::SonyA7Iv),
        vec![
            file_set(
                &volume,
                "A7401412",
                "DCIM/10030620",
                &["DCIM/10030620/A7401412.ARW", "DCIM/10030620/A7401412.HIF"],
            ),
            file_set(
                &volume,
                "C0109",
                "M4ROOT/CLIP",
                &["M4ROOT/CLIP/C0109.MP4", "M4ROOT/CLIP/C0109M01.XML"],
            ),
            file_set(
                &volume,
                "C0200",
                "private/M4ROOT/CLIP",
                &["private/M4ROOT/CLIP/C0200.MP4", "private/M4ROOT/CLIP/C0200M01.XML"],
            ),
        ]
    );
}

#[test]
fn insta360_go_2_keeps_every_file_in_camera_folder() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "DCIM/Camera01/LRV_20210320_172249_01_001.mp4");
    touch(root, "DCIM/Camera01/PRO_VID_20210320_172314_00_002.mp4");
    touch(root, "DCIM/fileinfo_list.list");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::Insta360Go2),
        vec![
            file_set(
                &volume,
                "LRV_20210320_172249_01_001",
                "DCIM/Camera01",
                &["DCIM/Camera01/LRV_20210320_172249_01_001.mp4"],
            ),
            file_set(
                &volume,
                "PRO_VID_20210320_172314_00_002",
                "DCIM/Camera01",
                &["DCIM/Camera01/PRO_VID_20210320_172314_00_002.mp4"],
            ),
        ]
    );
}

#[test]
fn insta360_one_skips_apple_double_files() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "DCIM/Camera01/IMG_20171217_115531_054.insp");
    touch(root, "DCIM/Camera01/._IMG_20171214_180905_018.insp");
    touch(root, "DCIM/Camera01/._VID_20171214_180827_017.insv");
    touch(root, "DCIM/Camera01/VID_20171222_153701_058.insv");

    let sets = enumerate_sorted(&volume, SourceType::Insta360One);
    assert_eq!(
        sets,
        vec![
            file_set(
                &volume,
                "IMG_20171217_115531_054",
                "DCIM/Camera01",
                &["DCIM/Camera01/IMG_20171217_115531_054.insp"],
            ),
            file_set(
                &volume,
                "VID_20171222_153701_058",
                "DCIM/Camera01",
                &["DCIM/Camera01/VID_20171222_153701_058.insv"],
            ),
        ]
    );
    assert!(sets
        .iter()
        .flat_map(|s| &s.files)
        .all(|f| !f.name().unwrap().starts_with("._")));
}

#[test]
fn gopro_10_groups_by_file_serial() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    for name in [
        "GX010265.MP4",
        "GL010265.LRV",
        "GX010265.THM",
        "GX010266.MP4",
        "GL010266.LRV",
        "GX010266.THM",
    ] {
        touch(root, &format!("DCIM/100GOPRO/{name}"));
    }

    assert_eq!(
        enumerate_sorted(&volume, SourceType::GoPro10),
        vec![
            file_set(
                &volume,
                "0265",
                "DCIM/100GOPRO",
                &[
                    "DCIM/100GOPRO/GL010265.LRV",
                    "DCIM/100GOPRO/GX010265.MP4",
                    "DCIM/100GOPRO/GX010265.THM",
                ],
            ),
            file_set(
                &volume,
                "0266",
                "DCIM/100GOPRO",
                &[
                    "DCIM/100GOPRO/GL010266.LRV",
                    "DCIM/100GOPRO/GX010266.MP4",
                    "DCIM/100GOPRO/GX010266.THM",
                ],
            ),
        ]
    );
}

#[test]
fn fujifilm_x100_pairs_jpeg_and_raw() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "DCIM/100_FUJI/DSCF0384.JPG");
    touch(root, "DCIM/100_FUJI/DSCF0384.RAF");
    touch(root, "DCIM/100_FUJI/._DSCF0384.RAF");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::FujifilmX100),
        vec![file_set(
            &volume,
            "DSCF0384",
            "DCIM/100_FUJI",
            &["DCIM/100_FUJI/DSCF0384.JPG", "DCIM/100_FUJI/DSCF0384.RAF"],
        )]
    );
}

#[test]
fn atomos_takes_root_files_but_not_frame_grabs_or_dotfiles() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "SHOGUN_S001_S001_T001.MOV");
    touch(root, "Frame Grab 0001.png");
    touch(root, ".Spotlight-V100");
    touch(root, "._SHOGUN_S001_S001_T001.MOV");
    touch(root, "nested/ignored.MOV");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::AtomosNinja),
        vec![file_set(
            &volume,
            "SHOGUN_S001_S001_T001",
            "",
            &["SHOGUN_S001_S001_T001.MOV"],
        )]
    );
}

#[test]
fn atem_iso_collects_whole_project_folder() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "Wedding/Wedding.drp");
    touch(root, "Wedding/Wedding.mp4");
    touch(root, "Wedding/._Wedding.drp");
    touch(root, "Wedding/Video ISO Files/Wedding CAM 1 01.mp4");
    touch(root, "Wedding/Video ISO Files/Media Files/Still 1.png");
    touch(root, "Wedding/Audio Source Files/Wedding MIC 1 01.wav");
    touch(root, "Wedding/notes.txt");
    touch(root, "Loose/clip.mp4");

    assert_eq!(
        enumerate_sorted(&volume, SourceType::AtemIso),
        vec![file_set(
            &volume,
            "Wedding",
            "Wedding",
            &[
                "Wedding/Audio Source Files/Wedding MIC 1 01.wav",
                "Wedding/Video ISO Files/Media Files/Still 1.png",
                "Wedding/Video ISO Files/Wedding CAM 1 01.mp4",
                "Wedding/Wedding.drp",
                "Wedding/Wedding.mp4",
            ],
        )]
    );
}

#[cfg(unix)]
#[test]
fn unreadable_folders_are_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, volume) = card();
    let root = &volume.mount_path;
    touch(root, "Wedding/Wedding.drp");
    touch(root, "Wedding/Wedding.mp4");
    touch(root, "DCIM/10030620/A7401412.ARW");
    touch(root, ".Trashes/501/old.drp");
    touch(root, "DCIM/LOCKED/A7409999.ARW");

    let locked = [root.join(".Trashes"), root.join("DCIM/LOCKED")];
    for dir in &locked {
        fs::set_permissions(dir, fs::Permissions::from_mode(0o333)).unwrap();
    }

    let atem = enumerate_source_files(&volume, SourceType::AtemIso);
    let sony = enumerate_source_files(&volume, SourceType::SonyA7Iv);

    for dir in &locked {
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    let atem = atem.expect("unreadable .Trashes does not fail the walk");
    let stems: Vec<&str> = atem.iter().map(|s| s.stem.as_str()).collect();
    assert_eq!(stems, vec!["Wedding"]);

    let sony = sony.expect("unreadable DCIM folder does not fail the walk");
    assert!(sony.iter().any(|s| s.stem == "A7401412"));
}

#[test]
fn enumeration_is_deterministic() {
    let (_dir, volume) = card();
    let root = &volume.mount_path;
    for name in ["GX010265.MP4", "GL010265.LRV", "GX020265.MP4", "GX010266.MP4"] {
        touch(root, &format!("DCIM/100GOPRO/{name}"));
    }

    let first = enumerate_source_files(&volume, SourceType::GoPro10).unwrap();
    let second = enumerate_source_files(&volume, SourceType::GoPro10).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn empty_card_yields_nothing() {
    let (_dir, volume) = card();
    for source_type in [
        SourceType::DjiMini3Pro,
        SourceType::SonyA7Iv,
        SourceType::GoPro10,
        SourceType::AtemIso,
    ] {
        assert!(
            enumerate_source_files(&volume, source_type).unwrap().is_empty(),
            "{source_type} should find nothing on an empty card"
        );
    }
}
