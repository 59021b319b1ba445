//! List Filter.
//!
//! Blacklist patterns are evaluated strictly before whitelist patterns and
//! the first match in stored order short-circuits, so a domain can never be
//! both deleted and kept by one decision. Patterns are glob-like: `*` stands
//! for zero or more characters and everything else is literal. Matching is
//! case-sensitive and unanchored.

use crate::base::policyerror::PolicyError;
use crate::policy::rule::Rule;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Whitelist,
    Blacklist,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Whitelist => "whitelist",
            ListKind::Blacklist => "blacklist",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`ListFilter::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListDecision {
    /// Matched a blacklist pattern; the cookie must be deleted.
    Blocked { pattern: String },
    /// Matched a whitelist pattern; the cookie is kept.
    Allowed { pattern: String },
    Undecided,
}

/// Per-domain settings applied to whitelisted domains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<bool>,
}

impl DomainOverride {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.expiration_minutes == Some(0) {
            return Err(PolicyError::InvalidRule(
                "override expirationMinutes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The rule this override stands for, absent fields taken from `default`.
    pub fn governing_rule(&self, default: &Rule) -> Rule {
        Rule {
            expiration_minutes: self.expiration_minutes.unwrap_or(default.expiration_minutes),
            encrypt: self.encrypt.unwrap_or(default.encrypt),
            priority: default.priority,
            auto_delete: default.auto_delete,
            pattern: None,
        }
    }
}

/// Compile a list glob into an unanchored, case-sensitive regex.
pub fn compile_glob(pattern: &str) -> Result<Regex, PolicyError> {
    if pattern.trim().is_empty() {
        return Err(PolicyError::malformed_pattern(pattern, "empty pattern"));
    }
    let source = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&source).map_err(|e| PolicyError::malformed_pattern(pattern, e))
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    raw: String,
    regex: Option<Regex>,
}

impl CompiledPattern {
    fn compile(list: ListKind, raw: &str) -> Self {
        let regex = match compile_glob(raw) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(list = %list, pattern = %raw, error = %e, "skipping malformed list pattern");
                None
            }
        };
        Self {
            raw: raw.to_string(),
            regex,
        }
    }
}

/// Compiled blacklist and whitelist.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    blacklist: Vec<CompiledPattern>,
    whitelist: Vec<CompiledPattern>,
}

impl ListFilter {
    /// Compile both lists. Malformed patterns are logged and never match.
    pub fn new<B, W>(blacklist: B, whitelist: W) -> Self
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
    {
        Self {
            blacklist: blacklist
                .into_iter()
                .map(|p| CompiledPattern::compile(ListKind::Blacklist, p.as_ref()))
                .collect(),
            whitelist: whitelist
                .into_iter()
                .map(|p| CompiledPattern::compile(ListKind::Whitelist, p.as_ref()))
                .collect(),
        }
    }

    pub fn evaluate(&self, domain: &str) -> ListDecision {
        if let Some(pattern) = first_match(&self.blacklist, domain) {
            return ListDecision::Blocked { pattern };
        }
        if let Some(pattern) = first_match(&self.whitelist, domain) {
            return ListDecision::Allowed { pattern };
        }
        ListDecision::Undecided
    }

    pub fn is_blocked(&self, domain: &str) -> bool {
        first_match(&self.blacklist, domain).is_some()
    }

    /// Number of patterns that failed to compile.
    pub fn malformed_count(&self) -> usize {
        self.blacklist
            .iter()
            .chain(self.whitelist.iter())
            .filter(|p| p.regex.is_none())
            .count()
    }
}

fn first_match(patterns: &[CompiledPattern], domain: &str) -> Option<String> {
    patterns
        .iter()
        .find(|p| p.regex.as_ref().is_some_and(|re| re.is_match(domain)))
        .map(|p| p.raw.clone())
}
