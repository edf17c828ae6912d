//! Directory-backed backend: one file per key.

use super::KeyValueBackend;
use crate::error::{Result, StoreError};
use fs2::FileExt;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Extension of value files.
const VALUE_EXT: &str = "json";

/// Backend storing each key as `<dir>/<key>.json`.
///
/// Holds an exclusive lock on `<dir>/LOCK` for its lifetime, so a second
/// backend on the same directory fails with [`StoreError::Locked`] instead
/// of racing whole-document writes. Writes go to a temporary file that is
/// synced and renamed over the old value.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,
}

impl FileBackend {
    /// Open a backend directory, creating it when `create_if_missing` is set.
    pub fn open(path: impl AsRef<Path>, create_if_missing: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if !create_if_missing {
                return Err(StoreError::NotInitialized);
            }
            fs::create_dir_all(&path)?;
        }

        let lock_file = Self::acquire_lock(&path)?;

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Directory this backend writes into.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.join("LOCK");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::Backend(format!("Invalid key: {key:?}")));
        }
        Ok(self.path.join(format!("{key}.{VALUE_EXT}")))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key)?;
        let tmp_path = path.with_extension(format!("{VALUE_EXT}.tmp"));

        let mut file = File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.value_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        // Best-effort unlock; the OS releases it on close anyway.
        let _ = self._lock_file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_and_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book");

        {
            let backend = FileBackend::open(&path, true).unwrap();
            backend.set("book_data", "{\"a\":1}").unwrap();
            assert!(path.join("book_data.json").exists());
        }

        let backend = FileBackend::open(&path, false).unwrap();
        assert_eq!(
            backend.get("book_data").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(backend.get("missing").unwrap(), None);
    }

    #[test]
    fn test_missing_directory_without_create() {
        let dir = TempDir::new().unwrap();
        let result = FileBackend::open(dir.path().join("nope"), false);
        assert!(matches!(result, Err(StoreError::NotInitialized)));
    }

    #[test]
    fn test_second_backend_is_locked_out() {
        let dir = TempDir::new().unwrap();
        let _first = FileBackend::open(dir.path(), true).unwrap();

        let second = FileBackend::open(dir.path(), true);
        assert!(matches!(second, Err(StoreError::Locked)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path(), true).unwrap();

        backend.set("k", "v").unwrap();
        backend.remove("k").unwrap();
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path(), true).unwrap();

        assert!(matches!(
            backend.set("../escape", "x"),
            Err(StoreError::Backend(_))
        ));
        assert!(matches!(backend.get(""), Err(StoreError::Backend(_))));
    }
}
