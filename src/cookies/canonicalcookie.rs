use serde::{Deserialize, Serialize};
use std::fmt;

/// A cookie as exposed by the host's cookie jar.
///
/// The engine never mutates a host cookie in place: it clones one, edits the
/// copy and hands it back through [`CookieStore::set`](crate::cookies::jar::CookieStore::set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    /// Raw host domain, including a leading dot for domain cookies.
    pub domain: String,
    pub path: String,
    pub value: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Expiration as epoch seconds; `None` for session cookies.
    #[serde(default)]
    pub expiration_date: Option<i64>,
    #[serde(default)]
    pub session_only: bool,
}

impl Cookie {
    /// Session cookie on `/` with the given name, domain and value.
    pub fn new(name: impl Into<String>, domain: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            path: "/".to_string(),
            value: value.into(),
            secure: false,
            http_only: false,
            expiration_date: None,
            session_only: true,
        }
    }

    pub fn with_expiration(mut self, expiration_date: i64) -> Self {
        self.expiration_date = Some(expiration_date);
        self.session_only = false;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Domain with one leading dot stripped, for display and side-table lookups.
    pub fn display_domain(&self) -> &str {
        display_domain(&self.domain)
    }

    pub fn key(&self) -> CookieKey {
        CookieKey {
            domain: self.domain.clone(),
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        match self.expiration_date {
            Some(expiry) => expiry < now,
            None => false,
        }
    }

    /// Seconds until expiry, negative once expired.
    pub fn seconds_until_expiry(&self, now: i64) -> Option<i64> {
        self.expiration_date.map(|expiry| expiry - now)
    }
}

/// Strip a single leading dot from a host domain.
pub fn display_domain(domain: &str) -> &str {
    domain.strip_prefix('.').unwrap_or(domain)
}

/// Identity of a cookie inside a host jar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CookieKey {
    pub domain: String,
    pub path: String,
    pub name: String,
}

impl fmt::Display for CookieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}#{}", self.domain, self.path, self.name)
    }
}
