//! Session-scoped scroll positions.
//!
//! One JSON record per navigation path under `scrollPos:<path>`. Records live
//! for the session only; a full unload deletes the current path's record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Key prefix for scroll records.
const KEY_PREFIX: &str = "scrollPos:";

/// Window context captured when a post is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollContext {
    /// Index of the activated post within the window.
    pub post_index: usize,
    pub window_start: usize,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ScrollContext {
    pub fn now(post_index: usize, window_start: usize) -> Self {
        Self {
            post_index,
            window_start,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Stored scroll position, optionally with window context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollRecord {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ScrollRecord {
    /// The saved window context, when both parts were recorded.
    pub fn context(&self) -> Option<(usize, usize)> {
        Some((self.post_index?, self.window_start?))
    }
}

/// String key/value storage scoped to one session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-process session storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// Typed access to scroll records in a [`SessionStorage`].
///
/// Cheap to clone; clones share the same storage. Concurrent writers to the
/// same path race and the last write wins.
#[derive(Clone)]
pub struct ScrollPositionStore {
    storage: Arc<dyn SessionStorage>,
}

impl ScrollPositionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// A store backed by fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    fn key(path: &str) -> String {
        format!("{}{}", KEY_PREFIX, path)
    }

    pub fn save(&self, path: &str, x: f64, y: f64, context: Option<ScrollContext>) {
        let record = ScrollRecord {
            x,
            y,
            post_index: context.map(|c| c.post_index),
            window_start: context.map(|c| c.window_start),
            timestamp: context.map(|c| c.timestamp),
        };
        match serde_json::to_string(&record) {
            Ok(json) => {
                tracing::debug!(path, y, window_start = ?record.window_start, "Saved scroll position");
                self.storage.set(&Self::key(path), json);
            }
            Err(e) => tracing::warn!(path, error = %e, "Failed to serialize scroll position"),
        }
    }

    /// Read the record for `path`. Unreadable records are treated as absent.
    pub fn load(&self, path: &str) -> Option<ScrollRecord> {
        let raw = self.storage.get(&Self::key(path))?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path, error = %e, "Ignoring malformed scroll record");
                None
            }
        }
    }

    pub fn remove(&self, path: &str) {
        self.storage.remove(&Self::key(path));
    }
}
