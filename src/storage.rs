//! Durable key/value storage for client-side state.
//!
//! Values are opaque strings addressed by a short namespace key. The file
//! backend keeps one document per key under a directory (by default
//! `~/.gold-admin/storage/`), so a restart sees whatever the previous run
//! wrote last.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("storage I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A namespaced string store that outlives the process.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// File-backed storage: `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage under the user's home directory, falling back to the
    /// working directory when no home is known.
    pub fn default_location() -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join(".gold-admin").join("storage"))
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Write beside the target and rename so readers never see half a record
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }
}

/// Write `value` to a fresh file readable only by its owner (on unix).
/// Records hold bearer tokens.
fn write_private(path: &Path, value: &str) -> std::io::Result<()> {
    // A leftover from an interrupted write would keep its old mode
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

/// In-process storage. Clones share the same map, which lets a test
/// "restart" by opening a second store over the same instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_set_get_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get("auth-storage").unwrap(), None);

        storage.set("auth-storage", "{\"a\":1}").unwrap();
        assert_eq!(
            storage.get("auth-storage").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.path().join("nested").join("auth-storage.json").exists());

        storage.set("auth-storage", "{}").unwrap();
        assert_eq!(storage.get("auth-storage").unwrap().as_deref(), Some("{}"));
        assert!(!dir.path().join("nested").join("auth-storage.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_record_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        // Stale temp file with open permissions from an earlier run
        std::fs::write(dir.path().join("auth-storage.json.tmp"), "old").unwrap();
        std::fs::set_permissions(
            dir.path().join("auth-storage.json.tmp"),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        storage.set("auth-storage", "{\"token\":\"t\"}").unwrap();
        let mode = std::fs::metadata(dir.path().join("auth-storage.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            MemoryStorage::new().get(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }
}
