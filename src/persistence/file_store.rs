//! Persistence layer backed by flat files
//!
//! Every folder is a single text file `<data_dir>/<folder>.txt` holding one
//! `<timestamp>-<payload>` line per record in insertion order. Posts append to
//! the file; compaction replaces it wholesale by writing a sibling temp file and
//! renaming it over the log. The temp file is named `.{folder}.{uuid}.tmp`, so
//! folder names close to the file system's name limit can be appended to but
//! not rewritten.
//!
//! The store does no locking of its own. Callers serialize access per folder
//! (see `Broker`).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::broker::record::{Record, to_log};
use crate::broker::topic::FolderName;
use crate::utils::error::StoreError;

#[derive(Debug, Clone)]
pub struct FolderStore {
    data_dir: PathBuf,
}

impl FolderStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, folder: &FolderName) -> PathBuf {
        self.data_dir.join(format!("{folder}.txt"))
    }

    /// Read the whole log. A missing file is `Ok(None)`. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub fn read(&self, folder: &FolderName) -> Result<Option<String>, StoreError> {
        let path = self.path_for(folder);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    /// Append one record, creating the data directory and the log if needed.
    pub fn append(&self, folder: &FolderName, record: &Record) -> Result<(), StoreError> {
        self.ensure_data_dir()?;
        let path = self.path_for(folder);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;
        file.write_all(format!("{record}\n").as_bytes())
            .map_err(|source| StoreError::Write { path, source })
    }

    /// Replace the log with exactly `records`.
    pub fn replace(&self, folder: &FolderName, records: &[Record]) -> Result<(), StoreError> {
        self.ensure_data_dir()?;
        let path = self.path_for(folder);
        let tmp = self
            .data_dir
            .join(format!(".{folder}.{}.tmp", Uuid::new_v4()));

        if let Err(source) = fs::write(&tmp, to_log(records)) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Write { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Rename { path, source });
        }
        Ok(())
    }

    /// Delete the log. Deleting a log that does not exist is not an error.
    pub fn remove(&self, folder: &FolderName) -> Result<(), StoreError> {
        let path = self.path_for(folder);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }

    fn ensure_data_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| StoreError::CreateDir {
            path: self.data_dir.clone(),
            source,
        })
    }
}

impl Default for FolderStore {
    fn default() -> Self {
        Self::new("data")
    }
}
