//! Host cookie-jar abstraction.
//!
//! The engine only ever reaches cookies through this trait: it lists them,
//! asks the host to write a modified copy, or asks the host to delete one.
//! Every write the host accepts is echoed back on the change stream, so the
//! engine sees its own writes as ordinary [`CookieChange`] notifications.

use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::Cookie;
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin, sync::Arc};
use tokio::sync::broadcast;

/// Alias for the boxed future returned by host collaborators.
pub type HostFuture<T> = Pin<Box<dyn Future<Output = Result<T, PolicyError>> + Send>>;

/// Why a cookie changed, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// Written or deleted through the cookie API (or by a page).
    Explicit,
    /// Replaced by a newer cookie with the same key.
    Overwrite,
    /// Removed because it expired.
    Expired,
    /// Removed by the host's own garbage collection.
    Evicted,
}

/// A cookie-changed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieChange {
    pub cookie: Cookie,
    pub removed: bool,
    pub cause: ChangeCause,
}

impl CookieChange {
    pub fn written(cookie: Cookie) -> Self {
        Self {
            cookie,
            removed: false,
            cause: ChangeCause::Explicit,
        }
    }

    pub fn removed(cookie: Cookie, cause: ChangeCause) -> Self {
        Self {
            cookie,
            removed: true,
            cause,
        }
    }
}

/// Selects cookies in [`CookieStore::list`]. Empty filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieFilter {
    /// Matches the cookie domain or any subdomain of it (leading dots ignored).
    pub domain: Option<String>,
    pub name: Option<String>,
}

impl CookieFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn matches(&self, cookie: &Cookie) -> bool {
        if let Some(name) = &self.name {
            if &cookie.name != name {
                return false;
            }
        }
        if let Some(domain) = &self.domain {
            let want = domain.trim_start_matches('.');
            let have = cookie.domain.trim_start_matches('.');
            if have != want && !have.ends_with(&format!(".{}", want)) {
                return false;
            }
        }
        true
    }
}

/// The host's cookie jar.
///
/// Implementations must be thread-safe; methods take `&self` and return
/// boxed futures so the trait stays object safe.
pub trait CookieStore: Send + Sync {
    /// Lists the live cookies selected by `filter`.
    fn list(&self, filter: CookieFilter) -> HostFuture<Vec<Cookie>>;

    /// Writes `cookie`, replacing any cookie with the same `(domain, path, name)`.
    fn set(&self, cookie: Cookie) -> HostFuture<()>;

    /// Deletes one cookie. Resolves to `false` when nothing was stored under the key.
    fn delete(&self, domain: &str, path: &str, name: &str) -> HostFuture<bool>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<CookieChange>;
}

impl<S: CookieStore + ?Sized> CookieStore for Arc<S> {
    fn list(&self, filter: CookieFilter) -> HostFuture<Vec<Cookie>> {
        (**self).list(filter)
    }

    fn set(&self, cookie: Cookie) -> HostFuture<()> {
        (**self).set(cookie)
    }

    fn delete(&self, domain: &str, path: &str, name: &str) -> HostFuture<bool> {
        (**self).delete(domain, path, name)
    }

    fn subscribe(&self) -> broadcast::Receiver<CookieChange> {
        (**self).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_domain_includes_subdomains() {
        let filter = CookieFilter::domain("example.com");

        assert!(filter.matches(&Cookie::new("a", "example.com", "1")));
        assert!(filter.matches(&Cookie::new("a", ".example.com", "1")));
        assert!(filter.matches(&Cookie::new("a", "www.example.com", "1")));
        assert!(!filter.matches(&Cookie::new("a", "notexample.com", "1")));
    }

    #[test]
    fn test_filter_name() {
        let filter = CookieFilter::all().with_name("sid");

        assert!(filter.matches(&Cookie::new("sid", "a.com", "1")));
        assert!(!filter.matches(&Cookie::new("sid2", "a.com", "1")));
    }
}
