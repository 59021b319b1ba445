//! Bounded audit log.
//!
//! A rolling window, newest first. Appends prepend and truncate under one
//! lock, so each entry lands whole, and leave the resulting snapshot in an
//! outbox. Whichever caller finds no writer active becomes the writer and
//! drains the outbox to storage; everyone else returns immediately. Only the
//! latest snapshot is kept, so a hung storage call stalls the one writer and
//! nothing else. In-memory state is authoritative: a failed write is logged
//! and the append stands.

use crate::audit::entry::AuditEntry;
use crate::storage::{self, keys, KeyValueStore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Default number of retained entries.
pub const DEFAULT_CAPACITY: usize = 1000;

enum Snapshot {
    Entries(Vec<AuditEntry>),
    Cleared,
}

/// Clears the writer flag even when the writing task is cancelled.
struct WriterFlag<'a>(&'a AtomicBool);

impl Drop for WriterFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AuditLog {
    capacity: usize,
    storage: Arc<dyn KeyValueStore>,
    window: Mutex<VecDeque<AuditEntry>>,
    /// Latest snapshot not yet handed to storage.
    outbox: Mutex<Option<Snapshot>>,
    writing: AtomicBool,
}

impl AuditLog {
    pub fn new(storage: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            storage,
            window: Mutex::new(VecDeque::new()),
            outbox: Mutex::new(None),
            writing: AtomicBool::new(false),
        }
    }

    /// Restore the persisted log. Malformed data leaves the log empty.
    pub async fn load(&self) {
        let stored = match storage::get_typed::<Vec<AuditEntry>>(self.storage.as_ref(), keys::AUDIT_LOG).await {
            Ok(Some(entries)) => entries,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable audit log");
                return;
            }
        };

        let mut window = self.window.lock().await;
        *window = stored.into_iter().take(self.capacity).collect();
        tracing::debug!(entries = window.len(), "audit log loaded");
    }

    pub async fn append(&self, entry: AuditEntry) {
        tracing::debug!(
            action = %entry.action,
            cookie = entry.cookie_name.as_deref().unwrap_or(""),
            domain = entry.domain.as_deref().unwrap_or(""),
            "audit"
        );

        {
            let mut window = self.window.lock().await;
            window.push_front(entry);
            window.truncate(self.capacity);
            // Posted under the window lock so snapshots reach the outbox in order.
            let snapshot = Snapshot::Entries(window.iter().cloned().collect());
            *self.outbox.lock().await = Some(snapshot);
        }

        self.flush().await;
    }

    /// Newest first, at most `limit` entries.
    pub async fn entries(&self, limit: Option<usize>) -> Vec<AuditEntry> {
        let window = self.window.lock().await;
        let limit = limit.unwrap_or(usize::MAX);
        window.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.window.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.window.lock().await.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empty memory and storage.
    pub async fn clear(&self) {
        {
            let mut window = self.window.lock().await;
            window.clear();
            *self.outbox.lock().await = Some(Snapshot::Cleared);
        }
        self.flush().await;
        tracing::info!("audit log cleared");
    }

    /// Drain the outbox unless another caller is already doing so.
    async fn flush(&self) {
        while self
            .writing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let writer = WriterFlag(&self.writing);
            loop {
                let next = self.outbox.lock().await.take();
                let Some(snapshot) = next else {
                    break;
                };
                self.write(snapshot).await;
            }
            drop(writer);

            // A snapshot posted between the last take and the flag reset
            // would otherwise wait for the next append.
            if self.outbox.lock().await.is_none() {
                break;
            }
        }
    }

    async fn write(&self, snapshot: Snapshot) {
        let result = match snapshot {
            Snapshot::Entries(entries) => storage::set_typed(self.storage.as_ref(), keys::AUDIT_LOG, &entries).await,
            Snapshot::Cleared => self.storage.remove(&[keys::AUDIT_LOG]).await,
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::AuditAction;
    use crate::cookies::jar::HostFuture;
    use crate::storage::{MemoryStore, StorageChange};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn log_with(capacity: usize) -> (AuditLog, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AuditLog::new(store.clone(), capacity), store)
    }

    #[tokio::test]
    async fn test_newest_first() {
        let (log, _) = log_with(10);
        log.append(AuditEntry::new(AuditAction::RuleSaved).detail("n", 1)).await;
        log.append(AuditEntry::new(AuditAction::RuleSaved).detail("n", 2)).await;

        let entries = log.entries(None).await;
        assert_eq!(entries[0].get("n"), Some(&serde_json::json!(2)));
        assert_eq!(entries.len(), 2);
        assert_eq!(log.entries(Some(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest() {
        let (log, store) = log_with(3);
        for i in 0..5 {
            log.append(AuditEntry::new(AuditAction::RuleApplied).detail("n", i)).await;
        }

        let entries = log.entries(None).await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].get("n"), Some(&serde_json::json!(4)));
        assert_eq!(entries[2].get("n"), Some(&serde_json::json!(2)));

        let stored = store.peek(keys::AUDIT_LOG).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory() {
        let (log, store) = log_with(10);
        store.set_fail_writes(true);

        log.append(AuditEntry::new(AuditAction::KeyRotated)).await;
        assert_eq!(log.len().await, 1);
        assert!(store.peek(keys::AUDIT_LOG).is_none());
    }

    #[tokio::test]
    async fn test_load_restores_and_tolerates_garbage() {
        let (log, store) = log_with(10);
        log.append(AuditEntry::new(AuditAction::Encrypted).cookie("sess", "mybank.com")).await;

        let reloaded = AuditLog::new(store.clone(), 10);
        reloaded.load().await;
        assert_eq!(reloaded.len().await, 1);

        storage::set_typed(store.as_ref(), keys::AUDIT_LOG, "garbage").await.unwrap();
        let broken = AuditLog::new(store, 10);
        broken.load().await;
        assert!(broken.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_empties_storage() {
        let (log, store) = log_with(10);
        log.append(AuditEntry::new(AuditAction::ListUpdated)).await;
        log.clear().await;

        assert!(log.is_empty().await);
        assert!(store.peek(keys::AUDIT_LOG).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_whole() {
        let (log, store) = log_with(1000);
        let log = Arc::new(log);

        let mut handles = Vec::new();
        for i in 0..50 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append(AuditEntry::new(AuditAction::RuleApplied).detail("n", i)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(log.len().await, 50);
        let stored = store.peek(keys::AUDIT_LOG).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 50);
    }

    /// Storage whose first write never completes.
    struct StuckFirstWrite {
        inner: MemoryStore,
        stuck: AtomicBool,
    }

    impl KeyValueStore for StuckFirstWrite {
        fn get(&self, keys: &[&str]) -> HostFuture<HashMap<String, Value>> {
            self.inner.get(keys)
        }

        fn set(&self, items: HashMap<String, Value>) -> HostFuture<()> {
            if !self.stuck.swap(true, Ordering::SeqCst) {
                return Box::pin(std::future::pending());
            }
            self.inner.set(items)
        }

        fn remove(&self, keys: &[&str]) -> HostFuture<()> {
            self.inner.remove(keys)
        }

        fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
            self.inner.subscribe()
        }
    }

    #[tokio::test]
    async fn test_hung_write_does_not_block_other_appends() {
        let store = Arc::new(StuckFirstWrite {
            inner: MemoryStore::new(),
            stuck: AtomicBool::new(false),
        });
        let log = Arc::new(AuditLog::new(store, 10));

        let first = {
            let log = log.clone();
            tokio::spawn(async move { log.append(AuditEntry::new(AuditAction::RuleSaved)).await })
        };
        tokio::time::timeout(Duration::from_secs(1), async {
            while log.len().await == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let second = tokio::time::timeout(
            Duration::from_secs(1),
            log.append(AuditEntry::new(AuditAction::KeyRotated)),
        )
        .await;
        assert!(second.is_ok());
        assert_eq!(log.len().await, 2);
        assert!(!first.is_finished());
        first.abort();
    }
}
