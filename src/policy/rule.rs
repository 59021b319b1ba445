//! Policy rules.
//!
//! A [`RuleSet`] maps a key (a domain substring such as `bank`) to a
//! [`Rule`]. The reserved key `*` holds the default rule, which always
//! exists, so resolution can never come back empty. Non-default rules keep
//! insertion order because the resolver is first-match-wins.

use crate::base::policyerror::PolicyError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Key of the default rule.
pub const DEFAULT_RULE_KEY: &str = "*";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulePriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Regular expression attached to a rule.
///
/// Written either bare (`bank`) or slash-delimited with flags (`/bank/i`).
/// Only the `i` flag is honoured; other flags are accepted and ignored.
#[derive(Clone)]
pub struct RulePattern {
    raw: String,
    /// `None` when the stored source no longer compiles.
    regex: Option<Regex>,
}

impl RulePattern {
    /// Parse and compile, rejecting anything that does not compile.
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let regex = compile_rule_regex(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            regex: Some(regex),
        })
    }

    /// Parse a stored pattern. A pattern that fails to compile is kept so it
    /// round-trips, but never matches.
    pub fn lenient(raw: &str) -> Self {
        match compile_rule_regex(raw) {
            Ok(regex) => Self {
                raw: raw.to_string(),
                regex: Some(regex),
            },
            Err(e) => {
                tracing::warn!(pattern = %raw, error = %e, "stored rule pattern does not compile");
                Self {
                    raw: raw.to_string(),
                    regex: None,
                }
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// `None` when the pattern is malformed.
    pub fn is_match(&self, domain: &str) -> Option<bool> {
        self.regex.as_ref().map(|re| re.is_match(domain))
    }
}

fn compile_rule_regex(raw: &str) -> Result<Regex, PolicyError> {
    if raw.trim().is_empty() {
        return Err(PolicyError::malformed_pattern(raw, "empty pattern"));
    }

    let (source, case_insensitive) = match split_delimited(raw) {
        Some((source, flags)) => (source, flags.contains('i')),
        None => (raw, false),
    };

    RegexBuilder::new(source)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| PolicyError::malformed_pattern(raw, e))
}

/// Split `/source/flags`. Flags must be ASCII letters.
fn split_delimited(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (source, flags) = (&rest[..end], &rest[end + 1..]);
    if source.is_empty() || !flags.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((source, flags))
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for RulePattern {}

impl fmt::Debug for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.raw, f)
    }
}

impl fmt::Display for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for RulePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for RulePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(RulePattern::lenient(&raw))
    }
}

/// Expiration and encryption policy for matching cookies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub expiration_minutes: u64,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub priority: RulePriority,
    /// Let matching cookies lapse: they are never offered for extension.
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<RulePattern>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            expiration_minutes: 60,
            encrypt: false,
            priority: RulePriority::Medium,
            auto_delete: false,
            pattern: None,
        }
    }
}

impl Rule {
    pub fn new(expiration_minutes: u64) -> Self {
        Self {
            expiration_minutes,
            ..Default::default()
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypt = true;
        self
    }

    pub fn with_priority(mut self, priority: RulePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    pub fn with_pattern(mut self, pattern: RulePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Check a rule before it is saved or imported.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.expiration_minutes == 0 {
            return Err(PolicyError::InvalidRule(
                "expirationMinutes must be greater than zero".into(),
            ));
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_valid() {
                return Err(PolicyError::malformed_pattern(
                    pattern.as_str(),
                    "does not compile",
                ));
            }
        }
        Ok(())
    }
}

/// A rule with its key, the persisted form (`{ "key": ..., ...rule }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub key: String,
    #[serde(flatten)]
    pub rule: Rule,
}

/// Insertion-ordered rules plus the reserved default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSet {
    default: Rule,
    rules: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(default: Rule) -> Self {
        Self {
            default,
            rules: Vec::new(),
        }
    }

    pub fn default_rule(&self) -> &Rule {
        &self.default
    }

    pub fn get(&self, key: &str) -> Option<&Rule> {
        if key == DEFAULT_RULE_KEY {
            return Some(&self.default);
        }
        self.rules.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// Insert or replace. A replaced key keeps its position.
    pub fn save(&mut self, key: &str, rule: Rule) -> Result<(), PolicyError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(PolicyError::InvalidRule("rule key must not be empty".into()));
        }
        rule.validate()?;

        if key == DEFAULT_RULE_KEY {
            self.default = rule;
        } else if let Some(slot) = self.rules.iter_mut().find(|(k, _)| k == key) {
            slot.1 = rule;
        } else {
            self.rules.push((key.to_string(), rule));
        }
        Ok(())
    }

    /// Returns whether a rule was removed.
    pub fn delete(&mut self, key: &str) -> Result<bool, PolicyError> {
        if key == DEFAULT_RULE_KEY {
            return Err(PolicyError::DefaultRuleRequired);
        }
        let before = self.rules.len();
        self.rules.retain(|(k, _)| k != key);
        Ok(self.rules.len() != before)
    }

    /// Non-default rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Number of rules including the default.
    pub fn len(&self) -> usize {
        self.rules.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Persisted form: default first, then insertion order.
    pub fn to_entries(&self) -> Vec<RuleEntry> {
        std::iter::once(RuleEntry {
            key: DEFAULT_RULE_KEY.to_string(),
            rule: self.default.clone(),
        })
        .chain(self.rules.iter().map(|(k, r)| RuleEntry {
            key: k.clone(),
            rule: r.clone(),
        }))
        .collect()
    }

    /// Rebuild from stored entries without validating them. A missing
    /// default is synthesized; a repeated key keeps its first position and
    /// its last value.
    pub fn from_entries(entries: Vec<RuleEntry>) -> Self {
        let mut set = RuleSet::new();
        for RuleEntry { key, rule } in entries {
            if key == DEFAULT_RULE_KEY {
                set.default = rule;
            } else if let Some(slot) = set.rules.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = rule;
            } else {
                set.rules.push((key, rule));
            }
        }
        set
    }

    /// Rebuild from entries, rejecting the first invalid one.
    pub fn try_from_entries(entries: Vec<RuleEntry>) -> Result<Self, PolicyError> {
        for entry in &entries {
            if entry.key.trim().is_empty() {
                return Err(PolicyError::InvalidRule("rule key must not be empty".into()));
            }
            entry.rule.validate().map_err(|e| {
                PolicyError::InvalidRule(format!("rule '{}': {}", entry.key, e))
            })?;
        }
        Ok(Self::from_entries(entries))
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_entries().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<RuleEntry>::deserialize(deserializer).map(RuleSet::from_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pattern_forms() {
        let bare = RulePattern::parse("bank").unwrap();
        assert_eq!(bare.is_match("mybank.com"), Some(true));
        assert_eq!(bare.is_match("MYBANK.com"), Some(false));

        let flagged = RulePattern::parse("/bank/i").unwrap();
        assert_eq!(flagged.is_match("MyBank.com"), Some(true));

        // Unknown flags are ignored.
        let global = RulePattern::parse("/bank/gi").unwrap();
        assert_eq!(global.is_match("BANK.org"), Some(true));

        // No closing delimiter: the slash is part of the regex.
        let open = RulePattern::parse("/bank").unwrap();
        assert_eq!(open.is_match("x/bank"), Some(true));
        assert_eq!(open.is_match("bank"), Some(false));
    }

    #[test]
    fn test_malformed_pattern() {
        assert!(matches!(
            RulePattern::parse("/ba(nk/i"),
            Err(PolicyError::MalformedPattern { .. })
        ));
        assert!(RulePattern::parse("  ").is_err());

        let stored = RulePattern::lenient("ba(nk");
        assert!(!stored.is_valid());
        assert_eq!(stored.is_match("bank"), None);
        assert_eq!(stored.as_str(), "ba(nk");
    }

    #[test]
    fn test_rule_validate() {
        assert!(Rule::new(15).validate().is_ok());
        assert!(matches!(Rule::new(0).validate(), Err(PolicyError::InvalidRule(_))));
        let bad = Rule::new(5).with_pattern(RulePattern::lenient("("));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_save_keeps_position_on_replace() {
        let mut set = RuleSet::new();
        set.save("bank", Rule::new(15)).unwrap();
        set.save("shop", Rule::new(30)).unwrap();
        set.save("bank", Rule::new(20).encrypted()).unwrap();

        let keys: Vec<&str> = set.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["bank", "shop"]);
        assert!(set.get("bank").unwrap().encrypt);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_default_rule_cannot_be_deleted() {
        let mut set = RuleSet::new();
        assert_eq!(set.delete("*"), Err(PolicyError::DefaultRuleRequired));
        assert_eq!(set.delete("missing"), Ok(false));

        set.save("*", Rule::new(30)).unwrap();
        assert_eq!(set.default_rule().expiration_minutes, 30);
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_default_default_rule() {
        let rule = RuleSet::new().default_rule().clone();
        assert_eq!(rule.expiration_minutes, 60);
        assert!(!rule.encrypt);
        assert_eq!(rule.priority, RulePriority::Medium);
        assert!(!rule.auto_delete);
    }

    #[test]
    fn test_persisted_form() {
        let mut set = RuleSet::with_default(Rule::new(30));
        set.save(
            "bank",
            Rule::new(15)
                .encrypted()
                .with_pattern(RulePattern::parse("/bank/i").unwrap()),
        )
        .unwrap();

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[0]["key"], "*");
        assert_eq!(json[0]["expirationMinutes"], 30);
        assert_eq!(json[1]["key"], "bank");
        assert_eq!(json[1]["pattern"], "/bank/i");
        assert_eq!(json[1]["priority"], "medium");

        let back: RuleSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_missing_default_is_synthesized() {
        let set: RuleSet =
            serde_json::from_value(json!([{ "key": "shop", "expirationMinutes": 10 }])).unwrap();
        assert_eq!(set.default_rule(), &Rule::default());
        assert_eq!(set.get("shop").unwrap().expiration_minutes, 10);
    }

    #[test]
    fn test_try_from_entries_rejects_invalid() {
        let entries = vec![RuleEntry {
            key: "x".into(),
            rule: Rule::new(0),
        }];
        assert!(RuleSet::try_from_entries(entries).is_err());
    }
}
