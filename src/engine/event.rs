use crate::cookies::jar::CookieChange;
use crate::engine::message::{Request, Response};
use tokio::sync::oneshot;

/// Alarm driving the near-expiry scan.
pub const ALARM_EXPIRY_SCAN: &str = "expiry-scan";
/// Alarm driving the stale-cookie reap.
pub const ALARM_STALE_REAP: &str = "stale-reap";

/// Everything the engine reacts to. Each event is handled by its own task.
#[derive(Debug)]
pub enum EngineEvent {
    CookieChanged(CookieChange),
    /// A policy-state key was written by someone (possibly the engine itself).
    StorageChanged { key: String },
    AlarmFired(String),
    NotificationClicked { id: String, button: usize },
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::CookieChanged(_) => "cookie_changed",
            EngineEvent::StorageChanged { .. } => "storage_changed",
            EngineEvent::AlarmFired(_) => "alarm_fired",
            EngineEvent::NotificationClicked { .. } => "notification_clicked",
            EngineEvent::Request { .. } => "request",
        }
    }
}
