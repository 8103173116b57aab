//! Persistence of the shopping document to disk.

use automerge::AutoCommit;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File holding the shopping document inside the data directory.
pub const DATA_FILENAME: &str = "shoplist.automerge";

/// Loads and saves the shopping document in a data directory.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    data_dir: PathBuf,
}

impl DocumentStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the document file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(DATA_FILENAME)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Loads the document, or `None` when no file was saved yet.
    pub fn load(&self) -> Result<Option<AutoCommit>, StorageError> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Read(path, e)),
        };
        AutoCommit::load(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt(path, e.to_string()))
    }

    /// Saves the document, creating the data directory if needed.
    ///
    /// Writes a sibling file first and renames it over the old one so a
    /// concurrent reader never sees a partial document.
    pub fn save(&self, doc: &mut AutoCommit) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StorageError::Write(self.data_dir.clone(), e))?;

        let path = self.path();
        let staging = path.with_extension("automerge.tmp");
        fs::write(&staging, doc.save()).map_err(|e| StorageError::Write(staging.clone(), e))?;
        fs::rename(&staging, &path).map_err(|e| StorageError::Write(path, e))?;

        Ok(())
    }
}

/// Failures reading or writing the shopping document file.
#[derive(Debug)]
pub enum StorageError {
    Read(PathBuf, io::Error),
    /// Writing the document or its staging file failed.
    Write(PathBuf, io::Error),
    /// The file holds bytes Automerge cannot load.
    Corrupt(PathBuf, String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Read(path, e) => {
                write!(f, "Cannot read shopping document {}: {}", path.display(), e)
            }
            StorageError::Write(path, e) => {
                write!(f, "Cannot write shopping document {}: {}", path.display(), e)
            }
            StorageError::Corrupt(path, e) => {
                write!(f, "Shopping document {} is corrupt: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Read(_, e) | StorageError::Write(_, e) => Some(e),
            StorageError::Corrupt(_, _) => None,
        }
    }
}
