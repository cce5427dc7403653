//! Durable client-side key/value storage.
//!
//! The browser front-ends this product started from lean on localStorage for
//! the selected paper, chat transcripts, and per-paper markers. Here that is
//! an explicit `KeyValueStore` trait injected into the stores, so the store
//! logic is testable against an in-memory fake. The production impl writes
//! one JSON file per key under the data directory.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Get/set/remove of JSON strings by key. Last writer wins; there is no
/// cross-process coordination.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Typed helpers over the raw string interface.
///
/// A stored value that fails to decode is logged and treated as absent —
/// stale or hand-edited state must never take the app down.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Discarding malformed stored value for {key}: {e}");
            None
        }
    }
}

pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => log::error!("Failed to serialize value for {key}: {e}"),
    }
}

// ── File-backed store ───────────────────────────────────────────────────────

/// One JSON file per key under `<data_dir>/state`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Result<Self, PersistError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Keys become filenames; anything outside [A-Za-z0-9_-] is mapped to '_'
    /// so callers can use ids and prefixes freely.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Failed to read stored key {key}: {e}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = fs::write(self.path_for(key), value) {
            log::error!("Failed to write stored key {key}: {e}");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove stored key {key}: {e}");
            }
        }
    }
}

// ── In-memory store ─────────────────────────────────────────────────────────

/// In-memory `KeyValueStore` for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().expect("store lock").contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("store lock").get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("store lock")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().expect("store lock").remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("a", "1");
        assert_eq!(store.get("a").as_deref(), Some("1"));
        store.remove("a");
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_json_helpers_roundtrip() {
        let store = MemoryStore::new();
        set_json(&store, "nums", &vec![1u32, 2, 3]);
        let back: Vec<u32> = get_json(&store, "nums").unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_json_treated_as_absent() {
        let store = MemoryStore::new();
        store.set("broken", "{not json");
        let back: Option<Vec<u32>> = get_json(&store, "broken");
        assert!(back.is_none());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state")).unwrap();
        store.set("selected_paper", r#"{"id":42}"#);
        assert_eq!(store.get("selected_paper").as_deref(), Some(r#"{"id":42}"#));
        store.remove("selected_paper");
        assert!(store.get("selected_paper").is_none());
        // Removing again is a no-op
        store.remove("selected_paper");
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().to_path_buf()).unwrap();
        store.set("chat_history/42", "x");
        assert_eq!(store.get("chat_history/42").as_deref(), Some("x"));
        // Sanitized name collides deliberately with the same key spelled safely
        assert_eq!(store.get("chat_history_42").as_deref(), Some("x"));
    }
}
