use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use fractic_server_error::ServerError;
use serde_json::Value;

use crate::errors::{CacheReadError, CacheSerializationError, CacheWriteError};

/// Key-value persistence for JSON snapshots. Writes are last-write-wins per
/// key; keys never interact.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn save(&self, key: &str, value: Value) -> Result<(), ServerError>;

    async fn load(&self, key: &str) -> Result<Option<Value>, ServerError>;
}

// In-memory.
// ---

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn save(&self, key: &str, value: Value) -> Result<(), ServerError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, ServerError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}

// File-backed.
// ---

/// One JSON file per key under `dir`.
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Escapes every byte outside `[A-Za-z0-9_-]` as `%XX`, so distinct keys
/// always map to distinct file names.
fn file_stem(key: &str) -> String {
    key.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn save(&self, key: &str, value: Value) -> Result<(), ServerError> {
        let bytes =
            serde_json::to_vec(&value).map_err(|e| CacheSerializationError::with_debug(key, &e))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CacheWriteError::with_debug(key, &e))?;
        // Write-then-rename keeps a concurrent reader from seeing half a file.
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| CacheWriteError::with_debug(key, &e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| CacheWriteError::with_debug(key, &e))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>, ServerError> {
        let contents = match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheReadError::with_debug(key, &e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| CacheReadError::with_debug(key, &e))
    }
}
