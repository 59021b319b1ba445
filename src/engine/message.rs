//! Request/response contract for UI surfaces.
//!
//! Both sides are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "addToList", "list": "blacklist", "pattern": "*.ads.example.com"}
//! {"type": "ok"}
//! ```

use crate::audit::entry::AuditEntry;
use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::Cookie;
use crate::cookies::category::{classify, CookieCategory};
use crate::cookies::psl::site_for;
use crate::crypto::envelope::EncryptedEnvelope;
use crate::crypto::sentinel;
use crate::engine::backup::BackupPayload;
use crate::policy::listfilter::{DomainOverride, ListKind};
use crate::policy::rule::{Rule, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Number of sites reported in [`Stats::top_sites`].
pub const TOP_SITES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    GetRules,
    GetLists,
    GetAuditLog {
        #[serde(default)]
        limit: Option<usize>,
    },
    GetStats,
    SaveRule {
        key: String,
        rule: Rule,
    },
    DeleteRule {
        key: String,
    },
    AddToList {
        list: ListKind,
        pattern: String,
    },
    RemoveFromList {
        list: ListKind,
        pattern: String,
    },
    SetDomainOverride {
        domain: String,
        #[serde(rename = "override")]
        domain_override: DomainOverride,
    },
    RemoveDomainOverride {
        domain: String,
    },
    EncryptValue {
        value: String,
        domain: String,
    },
    DecryptValue {
        domain: String,
        name: String,
    },
    DecryptEnvelope {
        envelope: EncryptedEnvelope,
    },
    RotateKey,
    ClearAuditLog,
    ExportBackup,
    ImportBackup {
        payload: Value,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetRules => "getRules",
            Request::GetLists => "getLists",
            Request::GetAuditLog { .. } => "getAuditLog",
            Request::GetStats => "getStats",
            Request::SaveRule { .. } => "saveRule",
            Request::DeleteRule { .. } => "deleteRule",
            Request::AddToList { .. } => "addToList",
            Request::RemoveFromList { .. } => "removeFromList",
            Request::SetDomainOverride { .. } => "setDomainOverride",
            Request::RemoveDomainOverride { .. } => "removeDomainOverride",
            Request::EncryptValue { .. } => "encryptValue",
            Request::DecryptValue { .. } => "decryptValue",
            Request::DecryptEnvelope { .. } => "decryptEnvelope",
            Request::RotateKey => "rotateKey",
            Request::ClearAuditLog => "clearAuditLog",
            Request::ExportBackup => "exportBackup",
            Request::ImportBackup { .. } => "importBackup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    Ok,
    /// Whether a list or rule edit changed anything.
    Updated {
        changed: bool,
    },
    Rules {
        rules: RuleSet,
    },
    Lists {
        whitelist: Vec<String>,
        blacklist: Vec<String>,
        domain_overrides: BTreeMap<String, DomainOverride>,
    },
    AuditLog {
        entries: Vec<AuditEntry>,
    },
    Stats(Stats),
    Encrypted {
        envelope: EncryptedEnvelope,
    },
    Decrypted {
        value: String,
    },
    Backup {
        payload: BackupPayload,
    },
    Error {
        message: String,
        code: i32,
    },
}

impl From<PolicyError> for Response {
    fn from(err: PolicyError) -> Self {
        Response::Error {
            message: err.to_string(),
            code: err.as_i32(),
        }
    }
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteCount {
    pub site: String,
    pub count: usize,
}

/// Dashboard numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_cookies: usize,
    pub session_cookies: usize,
    /// Cookies currently holding a reference sentinel.
    pub encrypted_cookies: usize,
    pub expiring_soon: usize,
    pub by_category: BTreeMap<CookieCategory, usize>,
    pub top_sites: Vec<SiteCount>,
    pub rules: usize,
    pub whitelist: usize,
    pub blacklist: usize,
    pub audit_entries: usize,
    pub encryption_available: bool,
    pub sweeper_available: bool,
}

impl Stats {
    /// Cookie-derived counters. Policy and subsystem fields are left for the caller.
    pub fn from_cookies(cookies: &[Cookie], now: i64, horizon_secs: i64) -> Self {
        let mut stats = Stats {
            total_cookies: cookies.len(),
            ..Default::default()
        };
        let mut sites: HashMap<String, usize> = HashMap::new();

        for cookie in cookies {
            match cookie.expiration_date {
                None => stats.session_cookies += 1,
                Some(exp) if exp >= now && exp - now <= horizon_secs => stats.expiring_soon += 1,
                Some(_) => {}
            }
            if sentinel::is_sentinel(&cookie.value) {
                stats.encrypted_cookies += 1;
            }
            *stats
                .by_category
                .entry(classify(&cookie.name, &cookie.domain))
                .or_insert(0) += 1;
            *sites.entry(site_for(&cookie.domain)).or_insert(0) += 1;
        }

        let mut top: Vec<SiteCount> = sites
            .into_iter()
            .map(|(site, count)| SiteCount { site, count })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.site.cmp(&b.site)));
        top.truncate(TOP_SITES);
        stats.top_sites = top;
        stats
    }
}
