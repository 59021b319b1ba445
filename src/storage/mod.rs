//! Host key/value persistence.
//!
//! Policy state, the audit log, the encryption key and every envelope live
//! as top-level entries in one key/value store. The engine reads them at
//! startup, writes after each mutation, and listens to the change stream so
//! edits made by another surface (an options page, a sync agent) are picked up.

pub mod memory;
pub mod persistence;

use crate::base::policyerror::PolicyError;
use crate::cookies::jar::HostFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use persistence::JsonFileStore;

/// Persisted key layout.
pub mod keys {
    pub const RULES: &str = "rules";
    pub const WHITELIST: &str = "whitelist";
    pub const BLACKLIST: &str = "blacklist";
    pub const DOMAIN_OVERRIDES: &str = "domainOverrides";
    pub const AUDIT_LOG: &str = "auditLog";
    pub const ENCRYPTION_KEY: &str = "encryptionKey";

    /// Prefix of per-cookie envelope entries.
    pub const ENVELOPE_PREFIX: &str = "encrypted_";

    /// Keys that make up the policy state.
    pub const POLICY_STATE: [&str; 4] = [RULES, WHITELIST, BLACKLIST, DOMAIN_OVERRIDES];

    /// `encrypted_<domain>_<name>`
    pub fn envelope(domain: &str, name: &str) -> String {
        format!("{}{}_{}", ENVELOPE_PREFIX, domain, name)
    }
}

/// One key written or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    /// `None` when the key was removed.
    pub new_value: Option<Value>,
}

/// The host's key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Reads the given keys; absent keys are simply missing from the map.
    fn get(&self, keys: &[&str]) -> HostFuture<HashMap<String, Value>>;

    /// Writes every entry of `items`.
    fn set(&self, items: HashMap<String, Value>) -> HostFuture<()>;

    fn remove(&self, keys: &[&str]) -> HostFuture<()>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, keys: &[&str]) -> HostFuture<HashMap<String, Value>> {
        (**self).get(keys)
    }

    fn set(&self, items: HashMap<String, Value>) -> HostFuture<()> {
        (**self).set(items)
    }

    fn remove(&self, keys: &[&str]) -> HostFuture<()> {
        (**self).remove(keys)
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        (**self).subscribe()
    }
}

/// Read and decode one entry. `Ok(None)` when the key is absent.
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PolicyError> {
    let mut map = store.get(&[key]).await?;
    match map.remove(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and write one entry.
pub async fn set_typed<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PolicyError> {
    let mut items = HashMap::with_capacity(1);
    items.insert(key.to_string(), serde_json::to_value(value)?);
    store.set(items).await
}
