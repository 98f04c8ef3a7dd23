//! Filesystem-backed blob store.

use std::path::{Path, PathBuf};

use super::{BlobStore, ExternalError};

/// Stores blobs as files under a root directory. Keys map to relative
/// paths; traversal segments are rejected outright.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ExternalError> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(ExternalError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid blob key"),
            });
        }
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ExternalError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExternalError::Io {
                key: key.to_string(),
                source: e,
            })?;
        }

        // Write to a temp sibling, then rename into place so readers never
        // observe a partial blob.
        let tmp = path.with_extension("tmp-write");
        std::fs::write(&tmp, bytes).map_err(|e| ExternalError::Io {
            key: key.to_string(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            ExternalError::Io {
                key: key.to_string(),
                source: e,
            }
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ExternalError> {
        let path = self.resolve(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExternalError::MissingBlob {
                key: key.to_string(),
            }),
            Err(e) => Err(ExternalError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn delete(&self, key: &str) -> Result<(), ExternalError> {
        let path = self.resolve(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            // Deleting a missing blob is not an error; delete is idempotent.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExternalError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, ExternalError> {
        let path = self.resolve(key)?;
        Ok(path.exists())
    }
}
