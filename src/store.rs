//! Durable JSON state files
//!
//! Writes go to a sibling temp file that is fsynced and renamed over the
//! target, so readers see either the old or the new document.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt state file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, `None` if the file does not exist yet
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the document atomically
    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(value)?;
        let tmp = self.path.with_extension("tmp");
        let io_err = |source| StoreError::Io {
            path: tmp.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(&body).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        n: u32,
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("state.json"));
        assert!(file.load::<Doc>().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested/state.json"));
        file.save(&Doc { n: 1 }).unwrap();
        file.save(&Doc { n: 2 }).unwrap();
        assert_eq!(file.load::<Doc>().unwrap(), Some(Doc { n: 2 }));
        assert!(!dir.path().join("nested/state.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let file = JsonFile::new(&path);
        assert!(matches!(file.load::<Doc>(), Err(StoreError::Decode { .. })));
    }
}
