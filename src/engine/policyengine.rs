//! The policy engine.
//!
//! [`PolicyEngine`] holds the state and the handlers; [`EngineHandle`] owns
//! the tasks that feed it. Every event (cookie change, alarm, notification
//! click, UI request) goes through one unbounded channel and is handled on
//! its own task. Handlers interleave at host I/O, so two events touching the
//! same cookie can race; the last host write wins. There is no per-domain
//! locking.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = Arc::new(PolicyEngine::new(config, cookies, storage, notifier).await);
//! let handle = engine.start();
//! let response = handle.request(Request::GetStats).await?;
//! handle.shutdown();
//! ```

use crate::audit::auditlog::AuditLog;
use crate::audit::entry::{AuditAction, AuditEntry};
use crate::base::context::unix_now;
use crate::base::policyerror::PolicyError;
use crate::cookies::canonicalcookie::{Cookie, CookieKey};
use crate::cookies::category::classify;
use crate::cookies::jar::{CookieChange, CookieFilter, CookieStore, HostFuture};
use crate::crypto::sentinel;
use crate::crypto::vault::EncryptionVault;
use crate::engine::backup;
use crate::engine::config::EngineConfig;
use crate::engine::event::{EngineEvent, ALARM_EXPIRY_SCAN, ALARM_STALE_REAP};
use crate::engine::message::{Request, Response, Stats};
use crate::engine::state::{Governance, PolicyState};
use crate::engine::subsystem::Subsystem;
use crate::host::alarms::{AlarmService, TokioAlarms};
use crate::host::notify::Notifier;
use crate::policy::resolver::{self, MatchedBy};
use crate::storage::{keys, KeyValueStore};
use crate::sweep::sweeper::Sweeper;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

/// What the cookie-change pipeline did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieOutcome {
    /// Removal, or the echo of the engine's own write.
    Ignored,
    /// Blacklisted; deletion was requested.
    Blocked { pattern: String },
    /// Whitelisted without an override; left untouched.
    Kept,
    Governed {
        rule_key: String,
        matched_by: MatchedBy,
        expiration_set: bool,
        encrypted: bool,
    },
}

pub struct PolicyEngine {
    config: EngineConfig,
    cookies: TrackedJar,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<PolicyState>,
    vault: Subsystem<EncryptionVault>,
    sweeper: Subsystem<Sweeper>,
    audit: AuditLog,
}

/// Host jar wrapper that remembers every cookie the engine writes, so the
/// change notification echoing that write is not governed a second time.
struct TrackedJar {
    inner: Arc<dyn CookieStore>,
    pending: Arc<DashMap<CookieKey, Vec<Cookie>>>,
}

impl TrackedJar {
    fn new(inner: Arc<dyn CookieStore>) -> Self {
        Self {
            inner,
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Drop every pending record. Returns how many writes were dropped.
    fn forget_all(&self) -> usize {
        let dropped = self.pending.iter().map(|writes| writes.value().len()).sum();
        self.pending.clear();
        dropped
    }

    /// Consume the record of an engine write matching `cookie`, if any.
    fn take_echo(&self, cookie: &Cookie) -> bool {
        forget(&self.pending, cookie)
    }
}

fn forget(pending: &DashMap<CookieKey, Vec<Cookie>>, cookie: &Cookie) -> bool {
    let key = cookie.key();
    let found = match pending.get_mut(&key) {
        Some(mut writes) => match writes.iter().position(|c| c == cookie) {
            Some(pos) => {
                writes.remove(pos);
                true
            }
            None => false,
        },
        None => false,
    };
    pending.remove_if(&key, |_, writes| writes.is_empty());
    found
}

impl CookieStore for TrackedJar {
    fn list(&self, filter: CookieFilter) -> HostFuture<Vec<Cookie>> {
        self.inner.list(filter)
    }

    fn set(&self, cookie: Cookie) -> HostFuture<()> {
        self.pending
            .entry(cookie.key())
            .or_default()
            .push(cookie.clone());
        let write = self.inner.set(cookie.clone());
        let pending = self.pending.clone();
        Box::pin(async move {
            let result = write.await;
            if result.is_err() {
                forget(&pending, &cookie);
            }
            result
        })
    }

    fn delete(&self, domain: &str, path: &str, name: &str) -> HostFuture<bool> {
        self.inner.delete(domain, path, name)
    }

    fn subscribe(&self) -> broadcast::Receiver<CookieChange> {
        self.inner.subscribe()
    }
}

impl PolicyEngine {
    /// Build the engine. Never fails: a subsystem that cannot start is
    /// marked unavailable and the rest keeps working.
    pub async fn new(
        config: EngineConfig,
        cookies: Arc<dyn CookieStore>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let state = match PolicyState::load(storage.as_ref()).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "failed to load policy state, using defaults");
                PolicyState::default()
            }
        };

        let vault = Subsystem::from_result("encryption", EncryptionVault::open(storage.clone()).await);
        let sweeper = Subsystem::from_result("sweeper", Sweeper::new(&config));

        let audit = AuditLog::new(storage.clone(), config.audit_capacity);
        audit.load().await;

        Self {
            config,
            cookies: TrackedJar::new(cookies),
            storage,
            notifier,
            state: RwLock::new(state),
            vault,
            sweeper,
            audit,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn vault(&self) -> &Subsystem<EncryptionVault> {
        &self.vault
    }

    pub fn sweeper(&self) -> &Subsystem<Sweeper> {
        &self.sweeper
    }

    /// Copy of the current policy state.
    pub async fn state(&self) -> PolicyState {
        self.state.read().await.clone()
    }

    // ---- cookie-change pipeline ----

    pub async fn handle_cookie_change(&self, change: CookieChange) -> CookieOutcome {
        if change.removed {
            return CookieOutcome::Ignored;
        }
        let cookie = change.cookie;
        if self.cookies.take_echo(&cookie) {
            return CookieOutcome::Ignored;
        }

        let state = self.state().await;
        let resolution = match state.govern(&cookie.domain) {
            Governance::Blocked { pattern } => {
                self.delete_blacklisted(&cookie, &pattern).await;
                return CookieOutcome::Blocked { pattern };
            }
            Governance::Kept { pattern } => {
                tracing::debug!(domain = %cookie.domain, pattern = %pattern, "whitelisted, kept");
                return CookieOutcome::Kept;
            }
            Governance::Governed(resolution) => resolution,
        };

        let now = unix_now();
        let mut current = cookie;
        let mut expiration_set = false;
        if let Some(updated) = resolver::apply_expiration(&current, &resolution.rule, now) {
            match self.cookies.set(updated.clone()).await {
                Ok(()) => {
                    current = updated;
                    expiration_set = true;
                }
                Err(e) => {
                    tracing::warn!(cookie = %current.key(), error = %e, "failed to write expiration")
                }
            }
        }

        let category = classify(&current.name, &current.domain);
        let mut entry = AuditEntry::new(AuditAction::RuleApplied)
            .cookie(&current.name, &current.domain)
            .detail("ruleKey", resolution.key.as_str())
            .detail("rule", serde_json::to_value(&resolution.rule).unwrap_or_default())
            .detail("matchedBy", resolution.matched_by.as_str())
            .detail("category", category.as_str())
            .detail("expirationSet", expiration_set);
        if expiration_set {
            if let Some(exp) = current.expiration_date {
                entry = entry.detail("expirationDate", exp);
            }
        }
        self.audit.append(entry).await;

        let wants_encryption = resolution.rule.encrypt || self.config.encrypts_category(category);
        let encrypted = wants_encryption && self.encrypt_cookie(&current).await;

        tracing::debug!(
            cookie = %current.key(),
            rule = %resolution.key,
            matched_by = %resolution.matched_by,
            expiration_set,
            encrypted,
            "cookie governed"
        );
        CookieOutcome::Governed {
            rule_key: resolution.key,
            matched_by: resolution.matched_by,
            expiration_set,
            encrypted,
        }
    }

    async fn delete_blacklisted(&self, cookie: &Cookie, pattern: &str) {
        match self
            .cookies
            .delete(&cookie.domain, &cookie.path, &cookie.name)
            .await
        {
            Ok(true) => {
                self.audit
                    .append(
                        AuditEntry::new(AuditAction::BlacklistDeleted)
                            .cookie(&cookie.name, &cookie.domain)
                            .detail("pattern", pattern),
                    )
                    .await;
                self.discard_envelope(cookie).await;
            }
            Ok(false) => tracing::debug!(cookie = %cookie.key(), "blacklisted cookie already gone"),
            Err(e) => tracing::warn!(cookie = %cookie.key(), error = %e, "failed to delete blacklisted cookie"),
        }
    }

    /// Drop the envelope a deleted cookie's sentinel pointed at.
    async fn discard_envelope(&self, cookie: &Cookie) {
        let Some((domain, name)) = sentinel::parse(&cookie.value) else {
            return;
        };
        let Some(vault) = self.vault.get() else {
            return;
        };
        if let Err(e) = vault.remove_envelope(&domain, &name).await {
            tracing::warn!(cookie = %cookie.key(), error = %e, "failed to remove envelope of deleted cookie");
        }
    }

    /// The cookie change stream dropped `missed` notifications. Echoes of
    /// engine writes may be among them, so every pending echo record is
    /// dropped rather than left to swallow a later genuine write.
    pub fn handle_change_lag(&self, missed: u64) {
        let dropped = self.cookies.forget_all();
        tracing::warn!(missed, dropped, "cookie change stream lagged");
    }

    /// Replace the value with a sentinel. Returns whether it happened.
    async fn encrypt_cookie(&self, cookie: &Cookie) -> bool {
        let Some(vault) = self.vault.get() else {
            tracing::debug!(cookie = %cookie.key(), "encryption unavailable, value left as is");
            return false;
        };
        if sentinel::is_sentinel(&cookie.value) {
            return false;
        }

        let sealed = match vault.seal_cookie(cookie).await {
            Ok(Some(sealed)) => sealed,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(cookie = %cookie.key(), error = %e, "failed to encrypt cookie");
                return false;
            }
        };

        if let Err(e) = self.cookies.set(sealed).await {
            tracing::warn!(cookie = %cookie.key(), error = %e, "failed to write sentinel");
            if let Err(e) = vault.remove_envelope(&cookie.domain, &cookie.name).await {
                tracing::warn!(cookie = %cookie.key(), error = %e, "failed to remove orphaned envelope");
            }
            return false;
        }

        self.audit
            .append(
                AuditEntry::new(AuditAction::Encrypted)
                    .cookie(&cookie.name, &cookie.domain)
                    .detail("envelopeKey", keys::envelope(&cookie.domain, &cookie.name)),
            )
            .await;
        true
    }

    // ---- state ----

    /// Re-read policy state from storage (after an external edit).
    pub async fn reload_state(&self) {
        let mut guard = self.state.write().await;
        match PolicyState::load(self.storage.as_ref()).await {
            Ok(state) => *guard = state,
            Err(e) => tracing::warn!(error = %e, "failed to reload policy state"),
        }
    }

    /// Apply `edit` to a copy of the state, persist `parts`, then publish
    /// the copy. Nothing changes if either step fails.
    async fn mutate_state<R>(
        &self,
        parts: &[&str],
        edit: impl FnOnce(&mut PolicyState) -> Result<R, PolicyError>,
    ) -> Result<R, PolicyError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = edit(&mut next)?;
        next.persist(self.storage.as_ref(), parts).await?;
        *guard = next;
        Ok(out)
    }

    // ---- sweeps ----

    pub async fn handle_alarm(&self, name: &str) {
        match name {
            ALARM_EXPIRY_SCAN => {
                self.run_expiry_scan().await;
            }
            ALARM_STALE_REAP => {
                self.run_stale_reap().await;
            }
            other => tracing::debug!(alarm = %other, "unknown alarm"),
        }
    }

    /// Returns the size of the batch offered.
    pub async fn run_expiry_scan(&self) -> usize {
        let Some(sweeper) = self.sweeper.get() else {
            return 0;
        };
        let state = self.state().await;
        match sweeper
            .scan_near_expiry(&self.cookies, &state, self.notifier.as_ref(), unix_now())
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "near-expiry scan failed");
                0
            }
        }
    }

    /// Returns the number of cookies deleted.
    pub async fn run_stale_reap(&self) -> usize {
        let Some(sweeper) = self.sweeper.get() else {
            return 0;
        };
        match sweeper
            .reap_stale(&self.cookies, &self.audit, unix_now())
            .await
        {
            Ok(deleted) => {
                for cookie in &deleted {
                    self.discard_envelope(cookie).await;
                }
                deleted.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "stale reap failed");
                0
            }
        }
    }

    /// Returns the number of cookies extended.
    pub async fn handle_notification_click(&self, id: &str, button: usize) -> usize {
        match self.sweeper.get() {
            Some(sweeper) => {
                sweeper
                    .handle_click(id, button, &self.cookies, &self.audit)
                    .await
            }
            None => 0,
        }
    }

    // ---- requests ----

    pub async fn handle_request(&self, request: Request) -> Response {
        let name = request.name();
        match self.try_request(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(request = name, error = %e, "request failed");
                e.into()
            }
        }
    }

    async fn try_request(&self, request: Request) -> Result<Response, PolicyError> {
        let response = match request {
            Request::GetRules => Response::Rules {
                rules: self.state.read().await.rules.clone(),
            },
            Request::GetLists => {
                let state = self.state.read().await;
                Response::Lists {
                    whitelist: state.whitelist().to_vec(),
                    blacklist: state.blacklist().to_vec(),
                    domain_overrides: state.overrides().clone(),
                }
            }
            Request::GetAuditLog { limit } => Response::AuditLog {
                entries: self.audit.entries(limit).await,
            },
            Request::GetStats => Response::Stats(self.stats().await?),

            Request::SaveRule { key, rule } => {
                let snapshot = serde_json::to_value(&rule)?;
                self.mutate_state(&[keys::RULES], |state| state.rules.save(&key, rule))
                    .await?;
                self.audit
                    .append(
                        AuditEntry::new(AuditAction::RuleSaved)
                            .detail("ruleKey", key.as_str())
                            .detail("rule", snapshot),
                    )
                    .await;
                Response::Ok
            }
            Request::DeleteRule { key } => {
                let changed = self
                    .mutate_state(&[keys::RULES], |state| state.rules.delete(&key))
                    .await?;
                if changed {
                    self.audit
                        .append(AuditEntry::new(AuditAction::RuleDeleted).detail("ruleKey", key.as_str()))
                        .await;
                }
                Response::Updated { changed }
            }
            Request::AddToList { list, pattern } => {
                let changed = self
                    .mutate_state(&[list.as_str()], |state| state.add_to_list(list, &pattern))
                    .await?;
                if changed {
                    self.audit_list_change(list.as_str(), "add", &pattern).await;
                }
                Response::Updated { changed }
            }
            Request::RemoveFromList { list, pattern } => {
                let changed = self
                    .mutate_state(&[list.as_str()], |state| Ok(state.remove_from_list(list, &pattern)))
                    .await?;
                if changed {
                    self.audit_list_change(list.as_str(), "remove", &pattern).await;
                }
                Response::Updated { changed }
            }
            Request::SetDomainOverride {
                domain,
                domain_override,
            } => {
                let snapshot = serde_json::to_value(&domain_override)?;
                self.mutate_state(&[keys::DOMAIN_OVERRIDES], |state| {
                    state.set_override(&domain, domain_override)
                })
                .await?;
                self.audit
                    .append(
                        AuditEntry::new(AuditAction::ListUpdated)
                            .domain(domain.as_str())
                            .detail("list", keys::DOMAIN_OVERRIDES)
                            .detail("operation", "set")
                            .detail("override", snapshot),
                    )
                    .await;
                Response::Ok
            }
            Request::RemoveDomainOverride { domain } => {
                let changed = self
                    .mutate_state(&[keys::DOMAIN_OVERRIDES], |state| Ok(state.remove_override(&domain)))
                    .await?;
                if changed {
                    self.audit
                        .append(
                            AuditEntry::new(AuditAction::ListUpdated)
                                .domain(domain.as_str())
                                .detail("list", keys::DOMAIN_OVERRIDES)
                                .detail("operation", "remove"),
                        )
                        .await;
                }
                Response::Updated { changed }
            }

            Request::EncryptValue { value, domain } => {
                let vault = self.vault.require("encryption")?;
                let envelope = vault.encrypt(&value, &domain).await?;
                self.audit
                    .append(
                        AuditEntry::new(AuditAction::Encrypted)
                            .domain(domain.as_str())
                            .detail("source", "api"),
                    )
                    .await;
                Response::Encrypted { envelope }
            }
            Request::DecryptValue { domain, name } => {
                let vault = self.vault.require("encryption")?;
                let value = vault.decrypt_stored(&domain, &name).await?;
                self.audit
                    .append(AuditEntry::new(AuditAction::Decrypted).cookie(name, domain))
                    .await;
                Response::Decrypted { value }
            }
            Request::DecryptEnvelope { envelope } => {
                let vault = self.vault.require("encryption")?;
                let value = vault.decrypt(&envelope).await?;
                self.audit
                    .append(
                        AuditEntry::new(AuditAction::Decrypted)
                            .domain(envelope.domain.as_str())
                            .detail("source", "envelope"),
                    )
                    .await;
                Response::Decrypted { value }
            }
            Request::RotateKey => {
                let vault = self.vault.require("encryption")?;
                vault.rotate_key().await?;
                self.audit.append(AuditEntry::new(AuditAction::KeyRotated)).await;
                Response::Ok
            }

            Request::ClearAuditLog => {
                self.audit.clear().await;
                Response::Ok
            }
            Request::ExportBackup => Response::Backup {
                payload: backup::export(&*self.state.read().await),
            },
            Request::ImportBackup { payload } => {
                self.import_backup(&payload).await?;
                Response::Ok
            }
        };
        Ok(response)
    }

    async fn audit_list_change(&self, list: &str, operation: &str, pattern: &str) {
        self.audit
            .append(
                AuditEntry::new(AuditAction::ListUpdated)
                    .detail("list", list)
                    .detail("operation", operation)
                    .detail("pattern", pattern),
            )
            .await;
    }

    /// Validate a backup payload as a unit, then replace the policy state.
    pub async fn import_backup(&self, payload: &Value) -> Result<(), PolicyError> {
        let imported = backup::validate(payload)?;
        let counts = (
            imported.rules.len(),
            imported.whitelist().len(),
            imported.blacklist().len(),
        );

        self.mutate_state(&keys::POLICY_STATE, move |state| {
            *state = imported;
            Ok(())
        })
        .await?;

        self.audit
            .append(
                AuditEntry::new(AuditAction::BackupImported)
                    .detail("rules", counts.0)
                    .detail("whitelist", counts.1)
                    .detail("blacklist", counts.2),
            )
            .await;
        tracing::info!(rules = counts.0, "backup imported");
        Ok(())
    }

    pub async fn stats(&self) -> Result<Stats, PolicyError> {
        let cookies = self.cookies.list(CookieFilter::all()).await?;
        let mut stats = Stats::from_cookies(&cookies, unix_now(), self.config.horizon_secs());

        {
            let state = self.state.read().await;
            stats.rules = state.rules.len();
            stats.whitelist = state.whitelist().len();
            stats.blacklist = state.blacklist().len();
        }
        stats.audit_entries = self.audit.len().await;
        stats.encryption_available = self.vault.is_available();
        stats.sweeper_available = self.sweeper.is_available();
        Ok(stats)
    }

    // ---- dispatch ----

    /// Handle one event to completion.
    pub async fn dispatch(&self, event: EngineEvent) {
        match event {
            EngineEvent::CookieChanged(change) => {
                self.handle_cookie_change(change).await;
            }
            EngineEvent::StorageChanged { key } => {
                if keys::POLICY_STATE.contains(&key.as_str()) {
                    self.reload_state().await;
                }
            }
            EngineEvent::AlarmFired(name) => self.handle_alarm(&name).await,
            EngineEvent::NotificationClicked { id, button } => {
                self.handle_notification_click(&id, button).await;
            }
            EngineEvent::Request { request, reply } => {
                let response = self.handle_request(request).await;
                if reply.send(response).is_err() {
                    tracing::debug!("requester went away before the reply");
                }
            }
        }
    }

    /// Start the event tasks with tokio-backed alarms.
    pub fn start(self: Arc<Self>) -> EngineHandle {
        self.start_with_alarms(TokioAlarms::new)
    }

    /// Start the event tasks with a caller-supplied alarm service.
    pub fn start_with_alarms<A, F>(self: Arc<Self>, make_alarms: F) -> EngineHandle
    where
        A: AlarmService + 'static,
        F: FnOnce(mpsc::UnboundedSender<EngineEvent>) -> A,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<EngineEvent>();
        let mut tasks = Vec::with_capacity(3);

        let engine = self.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let kind = event.kind();
                    engine.dispatch(event).await;
                    tracing::trace!(kind, "event handled");
                });
            }
        }));

        let mut cookie_rx = self.cookies.subscribe();
        let cookie_tx = tx.clone();
        let engine = self.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                match cookie_rx.recv().await {
                    Ok(change) => {
                        if cookie_tx.send(EngineEvent::CookieChanged(change)).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => engine.handle_change_lag(missed),
                    Err(RecvError::Closed) => break,
                }
            }
        }));

        let mut storage_rx = self.storage.subscribe();
        let storage_tx = tx.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                match storage_rx.recv().await {
                    Ok(change) => {
                        if !keys::POLICY_STATE.contains(&change.key.as_str()) {
                            continue;
                        }
                        if storage_tx
                            .send(EngineEvent::StorageChanged { key: change.key })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "storage change stream lagged");
                        // Something was missed; a reload covers it.
                        let key = keys::RULES.to_string();
                        if storage_tx.send(EngineEvent::StorageChanged { key }).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));

        let alarms = make_alarms(tx.clone());
        if self.sweeper.is_available() {
            let schedule = [
                (ALARM_EXPIRY_SCAN, self.config.expiry_scan_interval_minutes),
                (ALARM_STALE_REAP, self.config.stale_reap_interval_minutes),
            ];
            for (name, period) in schedule {
                if let Err(e) = alarms.schedule(name, period) {
                    tracing::error!(alarm = name, error = %e, "failed to schedule alarm");
                }
            }
        } else {
            tracing::warn!("sweeper unavailable, no alarms scheduled");
        }

        tracing::info!("policy engine started");
        EngineHandle {
            tx,
            tasks,
            alarms: Box::new(alarms),
        }
    }
}

/// Running engine. Dropping it stops the alarms and the event tasks.
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
    tasks: Vec<JoinHandle<()>>,
    alarms: Box<dyn AlarmService>,
}

impl EngineHandle {
    /// Send a request and wait for the reply.
    pub async fn request(&self, request: Request) -> Result<Response, PolicyError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineEvent::Request { request, reply })?;
        rx.await
            .map_err(|_| PolicyError::SubsystemUnavailable("engine"))
    }

    /// Queue an event (a notification click, a synthetic alarm).
    pub fn send(&self, event: EngineEvent) -> Result<(), PolicyError> {
        self.tx
            .send(event)
            .map_err(|_| PolicyError::SubsystemUnavailable("engine"))
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<EngineEvent> {
        self.tx.clone()
    }

    pub fn shutdown(self) {
        tracing::info!("policy engine stopping");
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.alarms.clear_all();
        for task in &self.tasks {
            task.abort();
        }
    }
}
