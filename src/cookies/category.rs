//! Cookie category classification.
//!
//! Maps a cookie name and domain to a descriptive tag through an ordered list
//! of pattern tests. The first matching test wins; nothing matching means
//! [`CookieCategory::Unknown`].

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieCategory {
    Essential,
    Analytics,
    Advertising,
    Functional,
    Security,
    Unknown,
}

impl CookieCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CookieCategory::Essential => "essential",
            CookieCategory::Analytics => "analytics",
            CookieCategory::Advertising => "advertising",
            CookieCategory::Functional => "functional",
            CookieCategory::Security => "security",
            CookieCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CookieCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct CategoryTest {
    category: CookieCategory,
    name: Regex,
    domain: Option<Regex>,
}

fn ci(pattern: &str) -> Regex {
    // Patterns below are literals; a failure here is a programming error caught by tests.
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("category pattern {pattern:?} does not compile: {e}"))
}

static TESTS: LazyLock<Vec<CategoryTest>> = LazyLock::new(|| {
    vec![
        CategoryTest {
            category: CookieCategory::Analytics,
            name: ci(r"^(_ga|_gid|_gat|__utm[a-z]?|_hj|_pk_|amplitude|mp_|ajs_)|analytics"),
            domain: Some(ci(r"google-analytics\.com|hotjar\.com|mixpanel\.com|segment\.(io|com)")),
        },
        CategoryTest {
            category: CookieCategory::Advertising,
            name: ci(r"^(_fbp|_gcl_|fr$|ide$|dsid$|test_cookie$|anj$|uuid2$)|_ads?_|criteo"),
            domain: Some(ci(r"doubleclick\.net|adnxs\.com|criteo\.(com|net)|adsrvr\.org|(^|\.)ads\.")),
        },
        CategoryTest {
            category: CookieCategory::Security,
            name: ci(r"csrf|xsrf|^__host-|^__secure-|token|auth|2fa|mfa"),
            domain: None,
        },
        CategoryTest {
            category: CookieCategory::Essential,
            name: ci(r"sess|^sid$|login|cart|basket|consent|^jsessionid$|^phpsessid$"),
            domain: None,
        },
        CategoryTest {
            category: CookieCategory::Functional,
            name: ci(r"lang|locale|pref|theme|timezone|^tz$|currency|region"),
            domain: None,
        },
    ]
});

/// Classify a cookie by name, then by domain, in fixed test order.
pub fn classify(name: &str, domain: &str) -> CookieCategory {
    for test in TESTS.iter() {
        if test.name.is_match(name) {
            return test.category;
        }
        if let Some(domain_re) = &test.domain {
            if domain_re.is_match(domain) {
                return test.category;
            }
        }
    }
    CookieCategory::Unknown
}
