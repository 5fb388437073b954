use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// A file on a source volume. Metadata is read from disk on every call, never cached.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct File {
    pub path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn size(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// The earliest timestamp the filesystem reports for this file.
    ///
    /// Birth time is used where the platform has one, but a modification time older than it
    /// wins: cards that were copied or restored carry a fresh birth time and the original
    /// modification time.
    pub fn created(&self) -> io::Result<SystemTime> {
        let metadata = std::fs::metadata(&self.path)?;
        let modified = metadata.modified()?;
        Ok(match metadata.created() {
            Ok(born) => born.min(modified),
            Err(_) => modified,
        })
    }
}

/// Files on one volume that belong to the same shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    pub files: Vec<File>,
    /// Grouping key, unique within `prefix`.
    pub stem: String,
    /// Directory of the set relative to `volume_path`.
    pub prefix: PathBuf,
    pub volume_path: PathBuf,
    pub volume_identifier: String,
}

impl FileSet {
    /// Earliest creation time across the set, in local time.
    pub fn created(&self) -> io::Result<DateTime<Local>> {
        let mut earliest: Option<SystemTime> = None;
        for file in &self.files {
            let created = file.created()?;
            earliest = Some(earliest.map_or(created, |e| e.min(created)));
        }
        earliest.map(DateTime::<Local>::from).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file set {:?} has no files", self.stem),
            )
        })
    }

    /// `path` relative to the volume root.
    pub fn relative_path<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.volume_path).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use std::time::Duration;

    #[test]
    fn file_set_created_is_the_earliest_file() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("C0001.MP4");
        let new = dir.path().join("C0001M01.XML");
        std::fs::write(&old, b"video").unwrap();
        std::fs::write(&new, b"xml").unwrap();

        let three_days_ago = SystemTime::now() - Duration::from_secs(3 * 24 * 60 * 60);
        set_file_mtime(&old, FileTime::from_system_time(three_days_ago)).unwrap();

        let set = FileSet {
            files: vec![File::new(&new), File::new(&old)],
            stem: "C0001".into(),
            prefix: PathBuf::new(),
            volume_path: dir.path().to_path_buf(),
            volume_identifier: "abc".into(),
        };

        let expected = DateTime::<Local>::from(File::new(&old).created().unwrap());
        assert_eq!(set.created().unwrap(), expected);
        let a_minute_ago = SystemTime::now() - Duration::from_secs(60);
        assert!(set.created().unwrap() < DateTime::<Local>::from(a_minute_ago));
    }

    #[test]
    fn empty_file_set_has_no_creation_time() {
        let set = FileSet {
            files: vec![],
            stem: "empty".into(),
            prefix: PathBuf::new(),
            volume_path: PathBuf::from("/Volumes/Untitled"),
            volume_identifier: "abc".into(),
        };
        assert!(set.created().is_err());
    }

    #[test]
    fn metadata_of_missing_file_is_an_error() {
        let file = File::new("/definitely/not/here.mp4");
        assert!(file.size().is_err());
        assert!(file.created().is_err());
        assert_eq!(file.name(), Some("here.mp4"));
    }
}
