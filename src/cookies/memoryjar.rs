use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::Cookie;
use crate::cookies::jar::{ChangeCause, CookieChange, CookieFilter, CookieStore, HostFuture};
use dashmap::{DashMap, DashSet};
use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Maximum cookies per domain (Chromium default is 180; kept lower here).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct StoredCookie {
    seq: u64,
    cookie: Cookie,
}

/// In-process cookie jar implementing [`CookieStore`].
///
/// Stands in for the host jar in tests, demos and embedders without a
/// browser. Writes and deletes are echoed on the change channel the same way
/// a browser reports them: an overwrite produces a `removed` notification for
/// the old cookie followed by one for the new cookie.
pub struct MemoryCookieJar {
    // Store: Map<Domain, List<Cookie>>
    store: Arc<DashMap<String, Vec<StoredCookie>>>,
    read_only: Arc<DashSet<String>>,
    next_seq: AtomicU64,
    tx: broadcast::Sender<CookieChange>,
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store: Arc::new(DashMap::new()),
            read_only: Arc::new(DashSet::new()),
            next_seq: AtomicU64::new(0),
            tx,
        }
    }

    /// Make the jar reject writes and deletes for `domain`, as a host does for
    /// partitions the extension may read but not modify.
    pub fn set_read_only(&self, domain: &str, read_only: bool) {
        if read_only {
            self.read_only.insert(domain.to_string());
        } else {
            self.read_only.remove(domain);
        }
    }

    /// Insert a cookie without emitting a change notification (initial load).
    pub fn seed(&self, cookie: Cookie) {
        self.insert(cookie);
    }

    /// Get total cookie count.
    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    /// Look up one cookie by key.
    pub fn get(&self, domain: &str, path: &str, name: &str) -> Option<Cookie> {
        self.store.get(domain).and_then(|entry| {
            entry
                .iter()
                .find(|s| s.cookie.path == path && s.cookie.name == name)
                .map(|s| s.cookie.clone())
        })
    }

    /// Clear all cookies.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn publish(&self, change: CookieChange) {
        // send() only fails when nobody is subscribed.
        let _ = self.tx.send(change);
    }

    /// Stores the cookie and returns (replaced, evicted).
    fn insert(&self, cookie: Cookie) -> (Option<Cookie>, Vec<Cookie>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();

        let mut replaced = None;
        if let Some(pos) = entry
            .iter()
            .position(|s| s.cookie.name == cookie.name && s.cookie.path == cookie.path)
        {
            replaced = Some(entry.remove(pos).cookie);
        }

        // Enforce per-domain limit, evicting the oldest write first
        let mut evicted = Vec::new();
        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            if let Some(oldest_idx) = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.seq)
                .map(|(i, _)| i)
            {
                evicted.push(entry.remove(oldest_idx).cookie);
            } else {
                break;
            }
        }

        entry.push(StoredCookie { seq, cookie });
        (replaced, evicted)
    }

    fn check_writable(&self, op: &'static str, domain: &str, name: &str) -> Result<(), PolicyError> {
        if self.read_only.contains(domain) {
            return Err(PolicyError::host_io(
                op,
                format!("{}#{}", domain, name),
                "domain is read-only",
            ));
        }
        Ok(())
    }

    fn set_now(&self, cookie: Cookie) -> Result<(), PolicyError> {
        self.check_writable("set", &cookie.domain, &cookie.name)?;

        let (replaced, evicted) = self.insert(cookie.clone());
        for old in evicted {
            self.publish(CookieChange::removed(old, ChangeCause::Evicted));
        }
        if let Some(old) = replaced {
            self.publish(CookieChange::removed(old, ChangeCause::Overwrite));
        }
        self.publish(CookieChange::written(cookie));
        Ok(())
    }

    fn delete_now(&self, domain: &str, path: &str, name: &str) -> Result<bool, PolicyError> {
        self.check_writable("delete", domain, name)?;

        let removed = match self.store.get_mut(domain) {
            Some(mut entry) => entry
                .iter()
                .position(|s| s.cookie.path == path && s.cookie.name == name)
                .map(|pos| entry.remove(pos).cookie),
            None => None,
        };

        match removed {
            Some(cookie) => {
                self.publish(CookieChange::removed(cookie, ChangeCause::Explicit));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl CookieStore for MemoryCookieJar {
    fn list(&self, filter: CookieFilter) -> HostFuture<Vec<Cookie>> {
        let mut cookies: Vec<Cookie> = self
            .store
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|s| filter.matches(&s.cookie))
                    .map(|s| s.cookie.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        cookies.sort_by(|a, b| a.key().cmp(&b.key()));
        Box::pin(future::ready(Ok(cookies)))
    }

    fn set(&self, cookie: Cookie) -> HostFuture<()> {
        Box::pin(future::ready(self.set_now(cookie)))
    }

    fn delete(&self, domain: &str, path: &str, name: &str) -> HostFuture<bool> {
        Box::pin(future::ready(self.delete_now(domain, path, name)))
    }

    fn subscribe(&self) -> broadcast::Receiver<CookieChange> {
        self.tx.subscribe()
    }
}
