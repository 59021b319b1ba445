use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    BlacklistDeleted,
    RuleApplied,
    Encrypted,
    Decrypted,
    AutoDelete,
    ExpirationExtended,
    KeyRotated,
    RuleSaved,
    RuleDeleted,
    ListUpdated,
    BackupImported,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::BlacklistDeleted => "BLACKLIST_DELETED",
            AuditAction::RuleApplied => "RULE_APPLIED",
            AuditAction::Encrypted => "ENCRYPTED",
            AuditAction::Decrypted => "DECRYPTED",
            AuditAction::AutoDelete => "AUTO_DELETE",
            AuditAction::ExpirationExtended => "EXPIRATION_EXTENDED",
            AuditAction::KeyRotated => "KEY_ROTATED",
            AuditAction::RuleSaved => "RULE_SAVED",
            AuditAction::RuleDeleted => "RULE_DELETED",
            AuditAction::ListUpdated => "LIST_UPDATED",
            AuditAction::BackupImported => "BACKUP_IMPORTED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a policy decision. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Action-specific fields, stored inline.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            action,
            cookie_name: None,
            domain: None,
            details: Map::new(),
        }
    }

    pub fn cookie(mut self, name: impl Into<String>, domain: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self.domain = Some(domain.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}
