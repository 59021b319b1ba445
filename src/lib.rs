//! # cookieguard
//!
//! A cookie policy engine: per-site expiration, encryption at rest,
//! whitelist/blacklist enforcement and a bounded audit trail.
//!
//! The engine never owns cookies. It reads, writes and deletes them through a
//! host [`CookieStore`](cookies::CookieStore) and keeps its own state in a
//! host [`KeyValueStore`](storage::KeyValueStore).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cookieguard::cookies::{Cookie, CookieStore, MemoryCookieJar};
//! use cookieguard::engine::{EngineConfig, PolicyEngine, Request};
//! use cookieguard::host::TracingNotifier;
//! use cookieguard::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let jar = Arc::new(MemoryCookieJar::new());
//!     let engine = PolicyEngine::new(
//!         EngineConfig::default(),
//!         jar.clone(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(TracingNotifier),
//!     )
//!     .await;
//!     let handle = Arc::new(engine).start();
//!
//!     jar.set(Cookie::new("sess", "mybank.com", "abc")).await.unwrap();
//!     let stats = handle.request(Request::GetStats).await.unwrap();
//!     println!("{:?}", stats);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and host-operation helpers
//! - [`cookies`] - Cookie model, classifier and the cookie-jar host trait
//! - [`storage`] - Key/value host trait, in-memory and file-backed stores
//! - [`host`] - Alarms and notifications
//! - [`policy`] - Rules, resolver and list filter
//! - [`crypto`] - Encryption at rest
//! - [`audit`] - Bounded audit log
//! - [`sweep`] - Near-expiry and retention sweeps
//! - [`engine`] - Event handling and the request contract
//!
//! ## Concurrency
//!
//! Every event runs on its own task. Handlers interleave at host I/O, so two
//! events for the same cookie may race; the last host write wins.

pub mod audit;
pub mod base;
pub mod cookies;
pub mod crypto;
pub mod engine;
pub mod host;
pub mod policy;
pub mod storage;
pub mod sweep;
