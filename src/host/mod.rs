//! Host timer and notification services.

pub mod alarms;
pub mod notify;

pub use alarms::{AlarmService, TokioAlarms};
pub use notify::{ChannelNotifier, Notification, Notifier, TracingNotifier};
