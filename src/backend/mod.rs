//! Key-value backends the store persists through.
//!
//! A backend holds opaque UTF-8 blobs under string keys, the way a browser's
//! local storage does. The store keeps three keys: the main document, a
//! reserved settings key and the backup list.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use crate::error::Result;

/// Storage for string blobs addressed by key.
pub trait KeyValueBackend: Send + Sync {
    /// Read a key; `None` if it was never written or has been removed.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// The three keys a store uses, derived from a prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageKeys {
    pub document: String,
    pub settings: String,
    pub backups: String,
}

impl StorageKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            document: format!("{prefix}_data"),
            settings: format!("{prefix}_settings"),
            backups: format!("{prefix}_backup"),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.document, &self.settings, &self.backups]
    }
}
