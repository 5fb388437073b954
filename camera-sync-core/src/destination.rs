use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use tracing::debug;

use crate::file::FileSet;
use crate::operation::{Operation, OperationKind};

/// Files are equal when their names and sizes agree.
///
/// Copies do not reliably carry timestamps over, so times are never compared. Content
/// hashing is not done.
pub fn is_file_identical(a: &Path, b: &Path) -> io::Result<bool> {
    let same_name = a.file_name() == b.file_name();
    Ok(same_name && std::fs::metadata(a)?.len() == std::fs::metadata(b)?.len())
}

/// Writes file sets into `root/YYYY-MM-DD/...` folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedFolderDestination {
    pub root: PathBuf,
}

impl DatedFolderDestination {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn destination_path(&self, relative: &Path, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string()).join(relative)
    }

    /// Plans every file of the set into the folder of the set's earliest creation date.
    pub fn generate_operations(&self, file_set: &FileSet) -> io::Result<Vec<Operation>> {
        let created = file_set.created()?;
        self.generate_operations_at(file_set, created)
    }

    /// Like [`Self::generate_operations`], with the set's timestamp supplied.
    pub fn generate_operations_at(
        &self,
        file_set: &FileSet,
        created: DateTime<Local>,
    ) -> io::Result<Vec<Operation>> {
        let date = created.date_naive();
        let mut operations = Vec::with_capacity(file_set.files.len());

        for file in &file_set.files {
            let relative = match file_set.relative_path(&file.path) {
                Some(relative) => relative.to_path_buf(),
                None => {
                    let name = file.path.file_name().ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("{:?} has no file name", file.path),
                        )
                    })?;
                    file_set.prefix.join(name)
                }
            };
            let destination = self.destination_path(&relative, date);
            let kind = classify(&file.path, &destination)?;
            debug!(
                stem = %file_set.stem,
                source = %file.path.display(),
                destination = %destination.display(),
                operation = %kind,
                "Planned operation"
            );
            operations.push(Operation {
                kind,
                source: file.path.clone(),
                destination,
            });
        }
        Ok(operations)
    }
}

fn classify(source: &Path, destination: &Path) -> io::Result<OperationKind> {
    let existing = match std::fs::metadata(destination) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(OperationKind::Copy),
        Err(e) => return Err(e),
    };
    if existing.len() != std::fs::metadata(source)?.len() {
        return Ok(OperationKind::Unknown);
    }
    if is_file_identical(source, destination)? {
        Ok(OperationKind::Identical)
    } else {
        Ok(OperationKind::Unknown)
    }
}
