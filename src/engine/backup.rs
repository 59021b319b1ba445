//! Backup export and validated import.
//!
//! An import is checked as a unit before anything is written: the envelope
//! fields, every rule, every list pattern and every override. Any failure
//! rejects the whole payload with [`PolicyError::InvalidBackup`].

use crate::base::policyerror::PolicyError;
use crate::engine::state::PolicyState;
use crate::policy::listfilter::{compile_glob, DomainOverride};
use crate::policy::rule::{Rule, RuleEntry, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub const BACKUP_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub rules: RuleSet,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub domain_overrides: BTreeMap<String, DomainOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupPayload {
    pub version: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub data: BackupData,
}

/// Snapshot the policy state.
pub fn export(state: &PolicyState) -> BackupPayload {
    BackupPayload {
        version: BACKUP_VERSION,
        timestamp: OffsetDateTime::now_utc(),
        data: BackupData {
            rules: state.rules.clone(),
            whitelist: state.whitelist().to_vec(),
            blacklist: state.blacklist().to_vec(),
            domain_overrides: state.overrides().clone(),
        },
    }
}

fn invalid(msg: impl Into<String>) -> PolicyError {
    PolicyError::InvalidBackup(msg.into())
}

/// Validate a raw payload and build the state it describes.
pub fn validate(payload: &Value) -> Result<PolicyState, PolicyError> {
    let root = payload
        .as_object()
        .ok_or_else(|| invalid("payload must be an object"))?;

    let version = root
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| invalid("missing numeric version"))?;
    if version == 0 || version > BACKUP_VERSION {
        return Err(invalid(format!("unsupported version {}", version)));
    }
    if !root.get("timestamp").is_some_and(Value::is_string) {
        return Err(invalid("missing timestamp"));
    }
    let data = root
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing data object"))?;

    let rules = parse_rules(data.get("rules"))?;
    let whitelist = parse_list(data, "whitelist")?;
    let blacklist = parse_list(data, "blacklist")?;
    let overrides = parse_overrides(data.get("domainOverrides"))?;

    Ok(PolicyState::new(rules, whitelist, blacklist, overrides))
}

/// Rules come as the ordered array the engine exports, or as a
/// `{ key: rule }` object.
fn parse_rules(value: Option<&Value>) -> Result<RuleSet, PolicyError> {
    let entries: Vec<RuleEntry> = match value {
        None | Some(Value::Null) => return Ok(RuleSet::new()),
        Some(array @ Value::Array(_)) => serde_json::from_value(array.clone())
            .map_err(|e| invalid(format!("rules: {}", e)))?,
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, rule)| {
                serde_json::from_value::<Rule>(rule.clone())
                    .map(|rule| RuleEntry {
                        key: key.clone(),
                        rule,
                    })
                    .map_err(|e| invalid(format!("rule '{}': {}", key, e)))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(invalid("rules must be an array or object")),
    };
    RuleSet::try_from_entries(entries).map_err(|e| invalid(e.to_string()))
}

fn parse_list(data: &Map<String, Value>, name: &str) -> Result<Vec<String>, PolicyError> {
    let Some(value) = data.get(name) else {
        return Ok(Vec::new());
    };
    let patterns: Vec<String> =
        serde_json::from_value(value.clone()).map_err(|e| invalid(format!("{}: {}", name, e)))?;
    for pattern in &patterns {
        compile_glob(pattern).map_err(|e| invalid(format!("{}: {}", name, e)))?;
    }
    Ok(patterns)
}

fn parse_overrides(value: Option<&Value>) -> Result<BTreeMap<String, DomainOverride>, PolicyError> {
    let Some(value) = value else {
        return Ok(BTreeMap::new());
    };
    let overrides: BTreeMap<String, DomainOverride> = serde_json::from_value(value.clone())
        .map_err(|e| invalid(format!("domainOverrides: {}", e)))?;
    for (domain, ov) in &overrides {
        ov.validate()
            .map_err(|e| invalid(format!("override '{}': {}", domain, e)))?;
    }
    Ok(overrides)
}
