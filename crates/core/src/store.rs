//! Whole-collection key-value persistence.
//!
//! The matcher keeps each collection under one key as a JSON document. State is read once at
//! startup and every mutation rewrites the collections it touched; there are no partial
//! writes, migrations or schema versions.
//!
//! ## Storage Layout
//!
//! [`JsonFileStore`] keeps one file per key:
//!
//! ```text
//! <data_dir>/
//!   trials.json
//!   patients.json
//!   selected-patient.json
//! ```

use crate::constants::STORE_FILE_EXTENSION;
use crate::validation::validate_store_key;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("failed to create storage directory {path}: {source}", path = path.display())]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove {key}: {source}")]
    Remove {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key-value store holding serialised collections.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Reads and deserialises the value under `key`.
///
/// An absent key, an unreadable value and malformed JSON all degrade to `T::default()`; the
/// latter two are logged.
pub fn load_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!("failed to read {}, starting empty: {}", key, e);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("malformed {} data, starting empty: {}", key, e);
            T::default()
        }
    }
}

/// Serialises `value` as the JSON document stored under `key`.
pub fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}

/// Serialises `value` and stores it under `key`.
pub fn save<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = to_json(key, value)?;
    store.set(key, &raw)
}

/// File-backed store: one `<key>.json` file per key under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (creating if needed) the store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::DirCreation {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_store_key(key)?;
        Ok(self
            .dir
            .join(format!("{}.{}", key, STORE_FILE_EXTENSION)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{}.tmp", STORE_FILE_EXTENSION));
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };

        // Write then rename so a crash never leaves a half-written collection behind.
        fs::write(&tmp, value).map_err(write_err)?;
        fs::rename(&tmp, &path).map_err(write_err)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-process store, used by tests and by callers that do not need durability.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_store_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_store_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        validate_store_key(key)?;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{PATIENTS_KEY, TRIALS_KEY};
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("nested").join("data");

        let store = JsonFileStore::open(&dir).expect("open should succeed");

        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileStore::open(temp_dir.path()).expect("open should succeed");

        assert_eq!(store.get(TRIALS_KEY).expect("get should succeed"), None);
    }

    #[test]
    fn test_set_get_remove_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = JsonFileStore::open(temp_dir.path()).expect("open should succeed");

        store.set(TRIALS_KEY, "[1,2]").expect("set should succeed");
        assert!(temp_dir.path().join("trials.json").is_file());
        assert!(!temp_dir.path().join("trials.json.tmp").exists());
        assert_eq!(
            store.get(TRIALS_KEY).expect("get should succeed").as_deref(),
            Some("[1,2]")
        );

        store.remove(TRIALS_KEY).expect("remove should succeed");
        assert!(!temp_dir.path().join("trials.json").exists());
        store
            .remove(TRIALS_KEY)
            .expect("removing an absent key should succeed");
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = JsonFileStore::open(temp_dir.path()).expect("open should succeed");

        let err = store
            .set("../escape", "[]")
            .expect_err("path traversal key should be rejected");
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_load_or_default_degrades_on_missing_and_malformed() {
        let mut store = MemoryStore::new();

        let missing: Vec<u32> = load_or_default(&store, PATIENTS_KEY);
        assert!(missing.is_empty());

        store.set(PATIENTS_KEY, "{not json").unwrap();
        let malformed: Vec<u32> = load_or_default(&store, PATIENTS_KEY);
        assert!(malformed.is_empty());

        store.set(PATIENTS_KEY, "null").unwrap();
        let null_value: Option<u32> = load_or_default(&store, PATIENTS_KEY);
        assert_eq!(null_value, None);
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = JsonFileStore::open(temp_dir.path()).expect("open should succeed");

        save(&mut store, PATIENTS_KEY, &vec!["a".to_string(), "b".to_string()])
            .expect("save should succeed");

        let reopened = JsonFileStore::open(temp_dir.path()).expect("reopen should succeed");
        let loaded: Vec<String> = load_or_default(&reopened, PATIENTS_KEY);
        assert_eq!(loaded, vec!["a", "b"]);
    }
}
