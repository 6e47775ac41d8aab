//! Local key-value persistence.
//!
//! Settings, cached categories, and session-scoped credential state are all
//! small string-keyed records. They live in JSON files under the data
//! directory, one file per scope (durable settings vs. volatile session).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// String-keyed storage for settings and credential state.
///
/// Persistence failures are non-fatal: implementations log and keep the
/// in-memory view so a read-only disk degrades to session-only behavior.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// A store handle shared between the configuration, credential store, and
/// category registry.
pub type SharedStore = Arc<Mutex<dyn KeyValueStore + Send>>;

/// Wrap a store for shared access.
pub fn shared<S: KeyValueStore + 'static>(store: S) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Key-value store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl JsonFileStore {
    /// Open a store, returning an empty one if the file is missing or corrupt.
    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to create store directory");
                return;
            }
        }
        match serde_json::to_string_pretty(&self.entries) {
            Ok(contents) => {
                if let Err(e) = fs::write(&self.path, contents) {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist store");
                }
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to serialize store");
            }
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.persist();
        }
    }
}

/// In-memory store with no persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trips_values() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");

        let mut store = JsonFileStore::open(path.clone());
        store.set("repo-owner", "octocat");
        store.set("repo-name", "prompts");

        let reopened = JsonFileStore::open(path);
        assert_eq!(reopened.get("repo-owner").as_deref(), Some("octocat"));
        assert_eq!(reopened.get("repo-name").as_deref(), Some("prompts"));
    }

    #[test]
    fn file_store_remove_persists() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");

        let mut store = JsonFileStore::open(path.clone());
        store.set("github-token", "ghp_secret");
        store.remove("github-token");

        let reopened = JsonFileStore::open(path);
        assert_eq!(reopened.get("github-token"), None);
    }

    #[test]
    fn corrupt_file_yields_empty_store() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json at all").expect("write");

        let store = JsonFileStore::open(path);
        assert_eq!(store.get("repo-owner"), None);
    }
}
