//! File-backed key/value store.
//!
//! The whole store is one pretty-printed JSON object. Every write rewrites
//! the file through a temporary sibling and a rename, so a crash mid-write
//! leaves the previous contents intact.

use crate::base::context::HostResultExt;
use crate::base::policyerror::PolicyError;
use crate::cookies::jar::HostFuture;
use crate::storage::{KeyValueStore, StorageChange};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

struct Inner {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
    tx: broadcast::Sender<StorageChange>,
}

/// Key/value store persisted as a JSON file.
#[derive(Clone)]
pub struct JsonFileStore {
    inner: Arc<Inner>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty one if the file does not exist.
    ///
    /// # Example
    /// ```ignore
    /// let store = JsonFileStore::open("/var/lib/cookieguard/state.json").await?;
    /// ```
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref().to_path_buf();

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(PolicyError::host_io(
                        "open",
                        path.display().to_string(),
                        "top-level value is not an object",
                    ))
                }
                Err(e) => return Err(PolicyError::host_io("open", path.display().to_string(), e)),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Map::new();
                write_atomically(&path, &empty).await?;
                tracing::debug!(path = %path.display(), "Created key/value store");
                empty
            }
            Err(e) => return Err(PolicyError::host_io("open", path.display().to_string(), e)),
        };

        let (tx, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                data: Mutex::new(data),
                tx,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

async fn write_atomically(path: &Path, data: &Map<String, Value>) -> Result<(), PolicyError> {
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .host_context("write", tmp.display())?;
    tokio::fs::rename(&tmp, path)
        .await
        .host_context("rename", path.display())
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> HostFuture<HashMap<String, Value>> {
        let inner = self.inner.clone();
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        Box::pin(async move {
            let data = inner.data.lock().await;
            Ok(keys
                .into_iter()
                .filter_map(|k| data.get(&k).cloned().map(|v| (k, v)))
                .collect())
        })
    }

    fn set(&self, items: HashMap<String, Value>) -> HostFuture<()> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut data = inner.data.lock().await;
            let mut next = data.clone();
            let mut changes = Vec::with_capacity(items.len());
            for (key, value) in items {
                let old_value = next.insert(key.clone(), value.clone());
                changes.push(StorageChange {
                    key,
                    old_value,
                    new_value: Some(value),
                });
            }

            // Only commit in memory once the file agrees.
            write_atomically(&inner.path, &next).await?;
            *data = next;
            drop(data);

            for change in changes {
                let _ = inner.tx.send(change);
            }
            Ok(())
        })
    }

    fn remove(&self, keys: &[&str]) -> HostFuture<()> {
        let inner = self.inner.clone();
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        Box::pin(async move {
            let mut data = inner.data.lock().await;
            let mut next = data.clone();
            let changes: Vec<StorageChange> = keys
                .into_iter()
                .filter_map(|key| {
                    next.remove(&key).map(|old| StorageChange {
                        key,
                        old_value: Some(old),
                        new_value: None,
                    })
                })
                .collect();
            if changes.is_empty() {
                return Ok(());
            }

            write_atomically(&inner.path, &next).await?;
            *data = next;
            drop(data);

            for change in changes {
                let _ = inner.tx.send(change);
            }
            Ok(())
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(store.get(&["rules"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_reopen_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let mut items = HashMap::new();
        items.insert("blacklist".to_string(), json!(["*.ads.example.com"]));
        store.set(items).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let got = reopened.get(&["blacklist"]).await.unwrap();
        assert_eq!(got["blacklist"], json!(["*.ads.example.com"]));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_host_io() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).await.err().unwrap();
        assert!(err.is_host_failure());
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_noop() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("s.json")).await.unwrap();
        store.remove(&["nothing"]).await.unwrap();
    }
}
