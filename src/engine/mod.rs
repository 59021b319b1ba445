//! The policy engine and its request contract.
//!
//! - [`policyengine`]: [`PolicyEngine`] handlers and the [`EngineHandle`] task set
//! - [`state`]: rules, lists and overrides as one persisted unit
//! - [`message`]: requests and responses exchanged with UI surfaces
//! - [`backup`]: export and validated import
//! - [`subsystem`]: availability wrapper for optional parts

pub mod backup;
pub mod config;
pub mod event;
pub mod message;
pub mod policyengine;
pub mod state;
pub mod subsystem;

pub use config::EngineConfig;
pub use event::EngineEvent;
pub use message::{Request, Response, Stats};
pub use policyengine::{CookieOutcome, EngineHandle, PolicyEngine};
pub use state::{Governance, PolicyState};
pub use subsystem::Subsystem;
