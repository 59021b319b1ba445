//! Rule Resolver.
//!
//! Picks the single rule governing a domain. Two passes over the non-default
//! rules, each in insertion order: first a rule whose pattern matches, then a
//! rule whose key is a substring of the domain. Nothing matching falls back
//! to the default rule, so resolution never fails.

use crate::cookies::canonicalcookie::Cookie;
use crate::policy::rule::{Rule, RuleSet, DEFAULT_RULE_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the governing rule was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchedBy {
    Pattern,
    Substring,
    Default,
    /// Whitelisted domain with a per-domain override.
    WhitelistOverride,
}

impl MatchedBy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchedBy::Pattern => "pattern",
            MatchedBy::Substring => "substring",
            MatchedBy::Default => "default",
            MatchedBy::WhitelistOverride => "whitelist-override",
        }
    }
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The governing rule for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: String,
    pub rule: Rule,
    pub matched_by: MatchedBy,
}

/// Resolve the rule governing `domain`. Matching runs against the raw domain.
pub fn resolve(domain: &str, rules: &RuleSet) -> Resolution {
    for (key, rule) in rules.iter() {
        let Some(pattern) = &rule.pattern else {
            continue;
        };
        match pattern.is_match(domain) {
            Some(true) => return resolution(key, rule, MatchedBy::Pattern),
            Some(false) => {}
            None => {
                tracing::debug!(key = %key, pattern = %pattern, "skipping malformed rule pattern")
            }
        }
    }

    for (key, rule) in rules.iter() {
        if domain.contains(key) {
            return resolution(key, rule, MatchedBy::Substring);
        }
    }

    resolution(DEFAULT_RULE_KEY, rules.default_rule(), MatchedBy::Default)
}

fn resolution(key: &str, rule: &Rule, matched_by: MatchedBy) -> Resolution {
    Resolution {
        key: key.to_string(),
        rule: rule.clone(),
        matched_by,
    }
}

/// Expiration (epoch seconds) a rule assigns to a cookie at `now`.
pub fn expiration_for(rule: &Rule, now: i64) -> i64 {
    let seconds = i64::try_from(rule.expiration_minutes.saturating_mul(60)).unwrap_or(i64::MAX);
    now.saturating_add(seconds)
}

/// Copy of `cookie` with the rule's expiration applied, or `None` when the
/// cookie already carries an expiration (those are left alone).
pub fn apply_expiration(cookie: &Cookie, rule: &Rule, now: i64) -> Option<Cookie> {
    if cookie.expiration_date.is_some() {
        return None;
    }
    let mut updated = cookie.clone();
    updated.expiration_date = Some(expiration_for(rule, now));
    updated.session_only = false;
    Some(updated)
}
