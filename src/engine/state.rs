//! Policy state: rules, lists and per-domain overrides.
//!
//! Owned by the engine and passed into each component call. Persistence is
//! explicit: every mutation is followed by [`PolicyState::persist`] for the
//! parts it touched.

use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::display_domain;
use crate::policy::listfilter::{compile_glob, DomainOverride, ListDecision, ListFilter, ListKind};
use crate::policy::resolver::{self, MatchedBy, Resolution};
use crate::policy::rule::RuleSet;
use crate::storage::{keys, KeyValueStore};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// What the policy says about one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Governance {
    Blocked { pattern: String },
    /// Whitelisted without an override: left untouched.
    Kept { pattern: String },
    Governed(Resolution),
}

#[derive(Debug, Clone, Default)]
pub struct PolicyState {
    pub rules: RuleSet,
    whitelist: Vec<String>,
    blacklist: Vec<String>,
    overrides: BTreeMap<String, DomainOverride>,
    filter: ListFilter,
}

impl PolicyState {
    pub fn new(
        rules: RuleSet,
        whitelist: Vec<String>,
        blacklist: Vec<String>,
        overrides: BTreeMap<String, DomainOverride>,
    ) -> Self {
        let filter = ListFilter::new(&blacklist, &whitelist);
        Self {
            rules,
            whitelist,
            blacklist,
            overrides,
            filter,
        }
    }

    /// Load from storage. Absent parts take defaults; malformed parts are
    /// logged and take defaults.
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self, PolicyError> {
        let mut map = store.get(&keys::POLICY_STATE).await?;

        let rules: RuleSet = decode_part(&mut map, keys::RULES);
        let whitelist: Vec<String> = decode_part(&mut map, keys::WHITELIST);
        let blacklist: Vec<String> = decode_part(&mut map, keys::BLACKLIST);
        let overrides: BTreeMap<String, DomainOverride> = decode_part(&mut map, keys::DOMAIN_OVERRIDES);

        tracing::debug!(
            rules = rules.len(),
            whitelist = whitelist.len(),
            blacklist = blacklist.len(),
            overrides = overrides.len(),
            "policy state loaded"
        );
        Ok(Self::new(rules, whitelist, blacklist, overrides))
    }

    /// Write the named parts (`keys::RULES`, `keys::WHITELIST`, ...).
    pub async fn persist(&self, store: &dyn KeyValueStore, parts: &[&str]) -> Result<(), PolicyError> {
        let mut items = HashMap::with_capacity(parts.len());
        for part in parts {
            items.insert(part.to_string(), self.part_value(part)?);
        }
        store.set(items).await
    }

    pub async fn persist_all(&self, store: &dyn KeyValueStore) -> Result<(), PolicyError> {
        self.persist(store, &keys::POLICY_STATE).await
    }

    fn part_value(&self, part: &str) -> Result<Value, PolicyError> {
        let value = match part {
            keys::RULES => serde_json::to_value(&self.rules)?,
            keys::WHITELIST => serde_json::to_value(&self.whitelist)?,
            keys::BLACKLIST => serde_json::to_value(&self.blacklist)?,
            keys::DOMAIN_OVERRIDES => serde_json::to_value(&self.overrides)?,
            other => return Err(PolicyError::NotFound(format!("state part '{}'", other))),
        };
        Ok(value)
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }

    pub fn list(&self, kind: ListKind) -> &[String] {
        match kind {
            ListKind::Whitelist => &self.whitelist,
            ListKind::Blacklist => &self.blacklist,
        }
    }

    pub fn overrides(&self) -> &BTreeMap<String, DomainOverride> {
        &self.overrides
    }

    /// Override for a domain, looked up by display domain.
    pub fn override_for(&self, domain: &str) -> Option<&DomainOverride> {
        self.overrides.get(display_domain(domain))
    }

    /// Add a pattern. Rejects malformed patterns; returns `false` for duplicates.
    pub fn add_to_list(&mut self, kind: ListKind, pattern: &str) -> Result<bool, PolicyError> {
        compile_glob(pattern)?;
        let list = self.list_mut(kind);
        if list.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        list.push(pattern.to_string());
        self.rebuild_filter();
        Ok(true)
    }

    pub fn remove_from_list(&mut self, kind: ListKind, pattern: &str) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|p| p != pattern);
        let removed = list.len() != before;
        if removed {
            self.rebuild_filter();
        }
        removed
    }

    pub fn set_override(&mut self, domain: &str, ov: DomainOverride) -> Result<(), PolicyError> {
        let domain = display_domain(domain.trim());
        if domain.is_empty() {
            return Err(PolicyError::InvalidRule("override domain must not be empty".into()));
        }
        ov.validate()?;
        self.overrides.insert(domain.to_string(), ov);
        Ok(())
    }

    pub fn remove_override(&mut self, domain: &str) -> bool {
        self.overrides.remove(display_domain(domain.trim())).is_some()
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<String> {
        match kind {
            ListKind::Whitelist => &mut self.whitelist,
            ListKind::Blacklist => &mut self.blacklist,
        }
    }

    fn rebuild_filter(&mut self) {
        self.filter = ListFilter::new(&self.blacklist, &self.whitelist);
    }

    /// Lists first, then the resolver.
    pub fn govern(&self, domain: &str) -> Governance {
        match self.filter.evaluate(domain) {
            ListDecision::Blocked { pattern } => Governance::Blocked { pattern },
            ListDecision::Allowed { pattern } => match self.overrides.get_key_value(display_domain(domain)) {
                Some((key, ov)) => Governance::Governed(Resolution {
                    key: key.clone(),
                    rule: ov.governing_rule(self.rules.default_rule()),
                    matched_by: MatchedBy::WhitelistOverride,
                }),
                None => Governance::Kept { pattern },
            },
            ListDecision::Undecided => Governance::Governed(resolver::resolve(domain, &self.rules)),
        }
    }
}

fn decode_part<T: DeserializeOwned + Default>(map: &mut HashMap<String, Value>, key: &str) -> T {
    match map.remove(key) {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "malformed policy state, using defaults");
            T::default()
        }),
        None => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::rule::Rule;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_govern_order() {
        let mut state = PolicyState::default();
        state.add_to_list(ListKind::Blacklist, "*.ads.example.com").unwrap();
        state.add_to_list(ListKind::Whitelist, "example.com").unwrap();
        state.add_to_list(ListKind::Whitelist, "trusted.org").unwrap();
        state
            .set_override(
                ".trusted.org",
                DomainOverride {
                    expiration_minutes: Some(120),
                    encrypt: Some(true),
                },
            )
            .unwrap();

        assert_eq!(
            state.govern("x.ads.example.com"),
            Governance::Blocked {
                pattern: "*.ads.example.com".into()
            }
        );
        assert_eq!(
            state.govern("www.example.com"),
            Governance::Kept {
                pattern: "example.com".into()
            }
        );

        match state.govern(".trusted.org") {
            Governance::Governed(res) => {
                assert_eq!(res.matched_by, MatchedBy::WhitelistOverride);
                assert_eq!(res.key, "trusted.org");
                assert_eq!(res.rule.expiration_minutes, 120);
                assert!(res.rule.encrypt);
            }
            other => panic!("unexpected {:?}", other),
        }

        match state.govern("news.org") {
            Governance::Governed(res) => assert_eq!(res.matched_by, MatchedBy::Default),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_list_edits() {
        let mut state = PolicyState::default();
        assert!(state.add_to_list(ListKind::Blacklist, "a.com").unwrap());
        assert!(!state.add_to_list(ListKind::Blacklist, "a.com").unwrap());
        assert!(state.add_to_list(ListKind::Blacklist, "").is_err());
        assert!(state.filter().is_blocked("a.com"));

        assert!(state.remove_from_list(ListKind::Blacklist, "a.com"));
        assert!(!state.remove_from_list(ListKind::Blacklist, "a.com"));
        assert!(!state.filter().is_blocked("a.com"));
    }

    #[tokio::test]
    async fn test_persist_and_load() {
        let store = MemoryStore::new();
        let mut state = PolicyState::default();
        state.rules.save("bank", Rule::new(15).encrypted()).unwrap();
        state.add_to_list(ListKind::Whitelist, "good.com").unwrap();
        state.persist_all(&store).await.unwrap();

        let loaded = PolicyState::load(&store).await.unwrap();
        assert!(loaded.rules.get("bank").unwrap().encrypt);
        assert_eq!(loaded.whitelist(), &["good.com".to_string()]);
        assert!(loaded.blacklist().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_part_falls_back() {
        let store = MemoryStore::new();
        let mut items = HashMap::new();
        items.insert(keys::BLACKLIST.to_string(), json!({"not": "a list"}));
        items.insert(keys::WHITELIST.to_string(), json!(["ok.com"]));
        store.set(items).await.unwrap();

        let loaded = PolicyState::load(&store).await.unwrap();
        assert!(loaded.blacklist().is_empty());
        assert_eq!(loaded.whitelist().len(), 1);
    }
}
