use crate::base::policyerror::PolicyError;
use crate::cookies::jar::HostFuture;
use crate::storage::{KeyValueStore, StorageChange};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Volatile key/value store.
pub struct MemoryStore {
    entries: DashMap<String, Value>,
    fail_writes: AtomicBool,
    tx: broadcast::Sender<StorageChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: DashMap::new(),
            fail_writes: AtomicBool::new(false),
            tx,
        }
    }

    /// Make every later `set`/`remove` fail, as a host does when its quota is exhausted.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Synchronous read for inspection.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn check_writable(&self, op: &'static str) -> Result<(), PolicyError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PolicyError::host_io(op, "memory store", "quota exceeded"));
        }
        Ok(())
    }

    fn set_now(&self, items: HashMap<String, Value>) -> Result<(), PolicyError> {
        self.check_writable("set")?;
        for (key, value) in items {
            let old_value = self.entries.insert(key.clone(), value.clone());
            let _ = self.tx.send(StorageChange {
                key,
                old_value,
                new_value: Some(value),
            });
        }
        Ok(())
    }

    fn remove_now(&self, keys: &[&str]) -> Result<(), PolicyError> {
        self.check_writable("remove")?;
        for key in keys {
            if let Some((key, old)) = self.entries.remove(*key) {
                let _ = self.tx.send(StorageChange {
                    key,
                    old_value: Some(old),
                    new_value: None,
                });
            }
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> HostFuture<HashMap<String, Value>> {
        let found = keys
            .iter()
            .filter_map(|k| self.entries.get(*k).map(|v| (k.to_string(), v.value().clone())))
            .collect();
        Box::pin(future::ready(Ok(found)))
    }

    fn set(&self, items: HashMap<String, Value>) -> HostFuture<()> {
        Box::pin(future::ready(self.set_now(items)))
    }

    fn remove(&self, keys: &[&str]) -> HostFuture<()> {
        Box::pin(future::ready(self.remove_now(keys)))
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }
}
