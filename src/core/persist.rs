//! Durable blob storage for per-device calibration state
//!
//! Two independent flat JSON blobs survive restarts: the keystone corner
//! geometry (written by the keystone widget, only ever cleared here) and the
//! camera pose owned by the view-state manager.

use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

use super::protocol::TableName;

/// Keystone correction geometry blob
pub const KEYSTONE_KEY: &str = "projMap";
/// Camera pose blob prefix, suffixed per table
pub const VIEW_STATE_KEY: &str = "projectionViewStateStorage";

/// Key of the camera pose blob for one table
pub fn view_state_key(table: &TableName) -> String {
    format!("{VIEW_STATE_KEY}.{}", table.as_str())
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not find a config directory")]
    NoConfigDir,

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid stored JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key → JSON string store. Writes are synchronous.
pub trait BlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store for headless runs and tests
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().contains_key(key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.blobs.lock().insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.lock().remove(key);
        Ok(())
    }
}
