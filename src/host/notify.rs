use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A user-facing notification with optional action buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub buttons: Vec<String>,
}

/// Fire-and-forget notification service.
///
/// Button clicks are reported back to the engine separately, as
/// [`EngineEvent::NotificationClicked`](crate::engine::event::EngineEvent::NotificationClicked).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            id = %notification.id,
            title = %notification.title,
            buttons = ?notification.buttons,
            "{}",
            notification.message
        );
    }
}

/// Forwards notifications into a channel, for a UI bridge or for tests.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_forwards() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(Notification {
            id: "n1".into(),
            title: "t".into(),
            message: "m".into(),
            buttons: vec!["Extend 1 hour".into(), "Dismiss".into()],
        });

        let got = rx.try_recv().unwrap();
        assert_eq!(got.id, "n1");
        assert_eq!(got.buttons.len(), 2);
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(Notification {
            id: "n".into(),
            title: String::new(),
            message: String::new(),
            buttons: Vec::new(),
        });
    }
}
