//! Expiration Sweeper.
//!
//! Two passes, each driven by its own alarm:
//! - near-expiry scan: one batched notification offering to extend every
//!   cookie about to expire,
//! - stale reap: deletes cookies set to outlive the retention ceiling.
//!
//! Only the latest near-expiry offer can be acted on; an unanswered
//! notification is dropped when the next scan runs.
//!
//! Neither pass touches encryption. Per-cookie host failures are logged and
//! skipped so one bad cookie never aborts a batch. Empty passes are silent.

use crate::audit::auditlog::AuditLog;
use crate::audit::entry::{AuditAction, AuditEntry};
use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::{Cookie, CookieKey};
use crate::cookies::jar::{CookieFilter, CookieStore};
use crate::engine::config::EngineConfig;
use crate::engine::state::{Governance, PolicyState};
use crate::host::notify::{Notification, Notifier};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub const EXTEND_BUTTON: usize = 0;
pub const BUTTONS: [&str; 2] = ["Extend 1 hour", "Dismiss"];

pub struct Sweeper {
    horizon_secs: i64,
    retention_secs: i64,
    extension_secs: i64,
    /// Batches offered for extension, by notification id.
    pending: DashMap<String, Vec<CookieKey>>,
    next_batch: AtomicU64,
}

impl Sweeper {
    pub fn new(config: &EngineConfig) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self {
            horizon_secs: config.horizon_secs(),
            retention_secs: config.retention_secs(),
            extension_secs: config.extension_secs(),
            pending: DashMap::new(),
            next_batch: AtomicU64::new(1),
        })
    }

    /// Cookies expiring in `[now, now + horizon]` that may be extended:
    /// not blacklisted and not governed by an auto-delete rule.
    pub fn near_expiry_candidates(&self, cookies: &[Cookie], state: &PolicyState, now: i64) -> Vec<Cookie> {
        cookies
            .iter()
            .filter(|c| match c.expiration_date {
                Some(exp) => exp >= now && exp - now <= self.horizon_secs,
                None => false,
            })
            .filter(|c| match state.govern(&c.domain) {
                Governance::Blocked { .. } => false,
                Governance::Kept { .. } => true,
                Governance::Governed(res) => !res.rule.auto_delete,
            })
            .cloned()
            .collect()
    }

    /// Cookies whose expiration lies more than the retention ceiling ahead.
    pub fn stale_candidates(&self, cookies: &[Cookie], now: i64) -> Vec<Cookie> {
        cookies
            .iter()
            .filter(|c| {
                c.expiration_date
                    .is_some_and(|exp| exp.saturating_sub(now) > self.retention_secs)
            })
            .cloned()
            .collect()
    }

    /// Offer near-expiry cookies for extension. Returns the batch size.
    pub async fn scan_near_expiry(
        &self,
        cookies: &dyn CookieStore,
        state: &PolicyState,
        notifier: &dyn Notifier,
        now: i64,
    ) -> Result<usize, PolicyError> {
        let all = cookies.list(CookieFilter::all()).await?;
        let batch = self.near_expiry_candidates(&all, state, now);
        // Each scan supersedes the previous offer; at most one batch is pending.
        self.pending.clear();
        if batch.is_empty() {
            return Ok(0);
        }

        let id = format!("expiry-{}", self.next_batch.fetch_add(1, Ordering::Relaxed));
        let count = batch.len();
        let minutes = self.horizon_secs / 60;
        self.pending
            .insert(id.clone(), batch.iter().map(Cookie::key).collect());

        notifier.notify(Notification {
            id: id.clone(),
            title: "Cookies expiring soon".into(),
            message: format!(
                "{} cookie{} will expire within {} minute{}.",
                count,
                if count == 1 { "" } else { "s" },
                minutes,
                if minutes == 1 { "" } else { "s" }
            ),
            buttons: BUTTONS.iter().map(|b| b.to_string()).collect(),
        });
        tracing::debug!(id = %id, count, "near-expiry batch offered");
        Ok(count)
    }

    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    /// Act on a notification button. Returns how many cookies were extended;
    /// an unknown id or the dismiss button extends nothing.
    pub async fn handle_click(
        &self,
        id: &str,
        button: usize,
        cookies: &dyn CookieStore,
        audit: &AuditLog,
    ) -> usize {
        let Some((_, batch)) = self.pending.remove(id) else {
            tracing::debug!(id = %id, "click for unknown notification");
            return 0;
        };
        if button != EXTEND_BUTTON {
            tracing::debug!(id = %id, "near-expiry batch dismissed");
            return 0;
        }

        let mut extended = 0;
        for key in batch {
            match self.extend_one(&key, cookies).await {
                Ok(Some((previous, next))) => {
                    extended += 1;
                    audit
                        .append(
                            AuditEntry::new(AuditAction::ExpirationExtended)
                                .cookie(&key.name, &key.domain)
                                .detail("previousExpiration", previous)
                                .detail("newExpiration", next),
                        )
                        .await;
                }
                Ok(None) => tracing::debug!(cookie = %key, "cookie gone before extension"),
                Err(e) => tracing::warn!(cookie = %key, error = %e, "failed to extend cookie"),
            }
        }
        tracing::info!(id = %id, extended, "near-expiry batch extended");
        extended
    }

    async fn extend_one(
        &self,
        key: &CookieKey,
        cookies: &dyn CookieStore,
    ) -> Result<Option<(i64, i64)>, PolicyError> {
        let filter = CookieFilter::domain(key.domain.clone()).with_name(key.name.clone());
        let current = cookies
            .list(filter)
            .await?
            .into_iter()
            .find(|c| c.domain == key.domain && c.path == key.path);
        let Some(mut cookie) = current else {
            return Ok(None);
        };
        let Some(previous) = cookie.expiration_date else {
            return Ok(None);
        };

        let next = previous.saturating_add(self.extension_secs);
        cookie.expiration_date = Some(next);
        cookie.session_only = false;
        cookies.set(cookie).await?;
        Ok(Some((previous, next)))
    }

    /// Delete every cookie past the retention ceiling. Returns the cookies
    /// the host confirmed deleted.
    pub async fn reap_stale(
        &self,
        cookies: &dyn CookieStore,
        audit: &AuditLog,
        now: i64,
    ) -> Result<Vec<Cookie>, PolicyError> {
        let all = cookies.list(CookieFilter::all()).await?;
        let stale = self.stale_candidates(&all, now);
        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let mut deleted = Vec::new();
        for cookie in stale {
            match cookies.delete(&cookie.domain, &cookie.path, &cookie.name).await {
                Ok(true) => {
                    let mut entry = AuditEntry::new(AuditAction::AutoDelete)
                        .cookie(&cookie.name, &cookie.domain)
                        .detail("reason", "retention");
                    if let Some(exp) = cookie.expiration_date {
                        entry = entry.detail("expirationDate", exp);
                    }
                    audit.append(entry).await;
                    deleted.push(cookie);
                }
                Ok(false) => tracing::debug!(cookie = %cookie.key(), "stale cookie already gone"),
                Err(e) => tracing::warn!(cookie = %cookie.key(), error = %e, "failed to reap stale cookie"),
            }
        }
        tracing::info!(deleted = deleted.len(), "stale cookies reaped");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::listfilter::ListKind;
    use crate::policy::rule::Rule;

    const NOW: i64 = 1_700_000_000;

    fn sweeper() -> Sweeper {
        Sweeper::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            near_expiry_horizon_minutes: 0,
            ..Default::default()
        };
        assert!(Sweeper::new(&config).is_err());
    }

    #[test]
    fn test_near_expiry_window() {
        let cookies = vec![
            Cookie::new("past", "a.com", "v").with_expiration(NOW - 1),
            Cookie::new("now", "a.com", "v").with_expiration(NOW),
            Cookie::new("edge", "a.com", "v").with_expiration(NOW + 300),
            Cookie::new("later", "a.com", "v").with_expiration(NOW + 301),
            Cookie::new("session", "a.com", "v"),
        ];
        let names: Vec<String> = sweeper()
            .near_expiry_candidates(&cookies, &PolicyState::default(), NOW)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["now", "edge"]);
    }

    #[test]
    fn test_near_expiry_skips_auto_delete_and_blacklisted() {
        let mut state = PolicyState::default();
        state.rules.save("temp", Rule::new(5).auto_delete()).unwrap();
        state.add_to_list(ListKind::Blacklist, "evil.com").unwrap();

        let cookies = vec![
            Cookie::new("a", "temp.com", "v").with_expiration(NOW + 60),
            Cookie::new("b", "evil.com", "v").with_expiration(NOW + 60),
            Cookie::new("c", "fine.com", "v").with_expiration(NOW + 60),
        ];
        let batch = sweeper().near_expiry_candidates(&cookies, &state, NOW);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "c");
    }

    #[test]
    fn test_stale_boundary() {
        let thirty_days = 30 * 24 * 3600;
        let cookies = vec![
            Cookie::new("exact", "a.com", "v").with_expiration(NOW + thirty_days),
            Cookie::new("over", "a.com", "v").with_expiration(NOW + thirty_days + 1),
            Cookie::new("session", "a.com", "v"),
        ];
        let stale = sweeper().stale_candidates(&cookies, NOW);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].name, "over");
    }
}
