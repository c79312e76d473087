//! Persistent key/value storage for preferences and statistics
//!
//! Values are JSON strings. The controller treats every storage failure as
//! non-fatal: it logs and keeps its in-memory state.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use bubble_core::{BubbleError, Result};

use crate::level::QualityLevel;

pub const PREFERENCES_KEY: &str = "adaptiveQuality_userPreferences";
pub const STATISTICS_KEY: &str = "adaptiveQuality_statistics";

/// Key/value storage backing preferences
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: FxHashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(BubbleError::Storage(format!("invalid key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(path, value)?;
        Ok(())
    }
}

/// Choices that survive restarts
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub last_quality_level: Option<QualityLevel>,
    pub auto_adjustment_enabled: Option<bool>,
    /// Milliseconds since the Unix epoch
    pub last_saved: Option<u64>,
}

/// Read and decode a JSON value, logging and returning `None` on any failure
pub(crate) fn load_json<T: for<'de> Deserialize<'de>>(
    store: &dyn PreferenceStore,
    key: &str,
) -> Option<T> {
    let raw = match store.load(key) {
        Ok(raw) => raw?,
        Err(err) => {
            tracing::warn!(key, error = %err, "failed to read stored value");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring malformed stored value");
            None
        }
    }
}

/// Encode and write a JSON value, logging failures
pub(crate) fn save_json<T: Serialize>(store: &mut dyn PreferenceStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(BubbleError::from)
        .and_then(|json| store.save(key, &json));
    if let Err(err) = result {
        tracing::warn!(key, error = %err, "failed to persist value");
    }
}
