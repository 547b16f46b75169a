// store.rs — OptionStore: named JSON blobs, one per shared collection.
//
// The persisted layout is three independently keyed blobs (`requests`,
// `programs`, `exercises`), each a JSON array. There are no secondary
// indices; every lookup is a linear scan by record id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use coach_policy::Collection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::SyncError;

/// Key/value storage for option blobs.
pub trait OptionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, SyncError>;

    fn set(&self, key: &str, value: &Value) -> Result<(), SyncError>;
}

impl<T: OptionStore + ?Sized> OptionStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<Value>, SyncError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), SyncError> {
        (**self).set(key, value)
    }
}

/// Read a collection. A missing or non-array blob reads as empty.
pub fn read_collection<S, R>(store: &S, collection: Collection) -> Result<Vec<R>, SyncError>
where
    S: OptionStore + ?Sized,
    R: DeserializeOwned,
{
    match store.get(collection.key())? {
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value).map_err(|source| SyncError::Store {
                key: collection.key().to_string(),
                source,
            })
        }
        _ => Ok(Vec::new()),
    }
}

pub fn write_collection<S, R>(
    store: &S,
    collection: Collection,
    records: &[R],
) -> Result<(), SyncError>
where
    S: OptionStore + ?Sized,
    R: Serialize,
{
    let value = serde_json::to_value(records)?;
    store.set(collection.key(), &value)
}

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    options: Mutex<HashMap<String, Value>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, key: &str) -> Result<Option<Value>, SyncError> {
        let options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        Ok(options.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), SyncError> {
        let mut options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        options.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// File-backed store: `<dir>/<key>.json` per option.
///
/// Writes go to a temp file that is renamed over the target, so a reader
/// sees either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct JsonFileOptionStore {
    dir: PathBuf,
}

impl JsonFileOptionStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SyncError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| SyncError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn option_file(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl OptionStore for JsonFileOptionStore {
    fn get(&self, key: &str) -> Result<Option<Value>, SyncError> {
        let path = self.option_file(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| SyncError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), SyncError> {
        let path = self.option_file(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&tmp, json).map_err(|source| SyncError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| SyncError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn missing_option_reads_as_empty_collection() {
        let store = MemoryOptionStore::new();
        let records: Vec<Value> = read_collection(&store, Collection::Requests).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn non_array_option_reads_as_empty_collection() {
        let store = MemoryOptionStore::new();
        store.set("programs", &json!("")).unwrap();
        let records: Vec<Value> = read_collection(&store, Collection::Programs).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_records_are_an_error() {
        let store = MemoryOptionStore::new();
        store.set("exercises", &json!([{"nope": true}])).unwrap();
        let result: Result<Vec<coach_lifecycle::CatalogEntry>, _> =
            read_collection(&store, Collection::Exercises);
        assert!(matches!(result, Err(SyncError::Store { .. })));
    }

    #[test]
    fn file_store_round_trips_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = JsonFileOptionStore::new(dir.path().join("options")).unwrap();

        assert!(store.get("requests").unwrap().is_none());
        store.set("requests", &json!([{"id": "r1"}])).unwrap();
        assert_eq!(store.get("requests").unwrap(), Some(json!([{"id": "r1"}])));

        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["requests.json".to_string()]);
    }

    #[test]
    fn file_store_overwrites() {
        let dir = tempdir().unwrap();
        let store = JsonFileOptionStore::new(dir.path()).unwrap();
        store.set("exercises", &json!([1])).unwrap();
        store.set("exercises", &json!([2, 3])).unwrap();
        assert_eq!(store.get("exercises").unwrap(), Some(json!([2, 3])));
    }
}
