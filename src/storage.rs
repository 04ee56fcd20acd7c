//! File-backed blob store for native runs

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::core::{BlobStore, StorageError};

const APP_DIR: &str = "cityscope-projection";

/// One `<key>.json` file per blob under a directory
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Store under the user config directory
    pub fn in_config_dir() -> Result<Self, StorageError> {
        let mut dir = dirs::config_dir().ok_or(StorageError::NoConfigDir)?;
        dir.push(APP_DIR);
        Ok(Self::at(dir))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        fs::write(&path, blob)?;
        debug!(path = %path.display(), "Blob saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> FileBlobStore {
        let dir = std::env::temp_dir().join(format!("{APP_DIR}-test-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        FileBlobStore::at(dir)
    }

    #[test]
    fn test_save_load_remove() {
        let store = temp_store("roundtrip");
        assert_eq!(store.load("projMap").unwrap(), None);

        store.save("projMap", r#"{"a":1}"#).unwrap();
        assert_eq!(store.load("projMap").unwrap().as_deref(), Some(r#"{"a":1}"#));

        store.remove("projMap").unwrap();
        assert_eq!(store.load("projMap").unwrap(), None);
        store.remove("projMap").unwrap();
        let _ = fs::remove_dir_all(&store.dir);
    }

    #[test]
    fn test_keys_are_sanitized() {
        let store = temp_store("sanitize");
        let path = store.path("../view/state");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(".._view_state.json"));
        assert_eq!(path.parent(), Some(store.dir.as_path()));
    }

    #[test]
    fn test_per_table_keys_get_separate_files() {
        let store = temp_store("tables");
        store.save("projectionViewStateStorage.volpe", "1").unwrap();
        store.save("projectionViewStateStorage.corktown", "2").unwrap();
        assert_eq!(store.load("projectionViewStateStorage.volpe").unwrap().as_deref(), Some("1"));
        let _ = fs::remove_dir_all(&store.dir);
    }
}
