//! `window.localStorage` blob store for the browser build

use crate::core::{BlobStore, StorageError};
use web_sys::Storage;

pub struct LocalStorageBlobStore {
    storage: Storage,
}

impl LocalStorageBlobStore {
    pub fn new() -> Result<Self, StorageError> {
        let storage = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".into()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))?;
        Ok(Self { storage })
    }
}

impl BlobStore for LocalStorageBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, blob)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }
}
