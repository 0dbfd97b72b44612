use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// Envelope version written alongside every record. Reads accept bare
/// (unversioned) values so data from older layouts still loads.
const STORE_VERSION: u64 = 1;

/// Namespaced keys, one JSON file per logical record.
pub mod keys {
    pub const IDENTITY: &str = "identity";
    pub const USERS: &str = "users";
    pub const HISTORY: &str = "history";
    pub const ARCHIVE: &str = "archive";
    pub const SETTINGS: &str = "settings";
    pub const DRAFT: &str = "draft";
}

/// Key-value adapter over per-record JSON files in the data directory.
///
/// Every operation is infallible from the caller's perspective: decode or IO
/// failures are logged and reported as "absent". No transactionality across
/// keys; each record is written independently.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            log::warn!("store: could not create {}: {}", dir.display(), e);
        }
        Store { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("store: failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("store: corrupt record '{}': {}", key, e);
                return None;
            }
        };
        // Unwrap the versioned envelope when present; bare values pass through.
        let data = match value {
            Value::Object(mut map) if map.contains_key("v") && map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        match serde_json::from_value(data) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::warn!("store: record '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let envelope = json!({ "v": STORE_VERSION, "data": value });
        let content = match serde_json::to_string_pretty(&envelope) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("store: failed to serialize '{}': {}", key, e);
                return;
            }
        };
        let path = self.path(key);
        if let Err(e) = std::fs::write(&path, content) {
            log::warn!("store: failed to write {}: {}", path.display(), e);
        }
    }

    pub fn remove(&self, key: &str) {
        let path = self.path(key);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("store: failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
