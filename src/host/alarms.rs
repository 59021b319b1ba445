//! Named periodic alarms.
//!
//! Minute granularity, like the host timer services the engine runs under.
//! Alarms only enqueue an [`EngineEvent::AlarmFired`]; they never await the
//! handler, so a stalled sweep cannot delay the next tick.

use crate::base::policyerror::PolicyError;
use crate::engine::event::EngineEvent;
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Longest accepted period; longer requests are clamped to it.
pub const MAX_PERIOD_MINUTES: u64 = 1 << 32;

/// Timer service driving the periodic sweeps.
pub trait AlarmService: Send + Sync {
    /// Schedule `name` to fire every `period_minutes`, first one period from now.
    /// Scheduling an existing name replaces it.
    fn schedule(&self, name: &str, period_minutes: u64) -> Result<(), PolicyError>;

    /// Returns whether an alarm was cleared.
    fn clear(&self, name: &str) -> bool;

    fn clear_all(&self);
}

/// [`AlarmService`] backed by tokio interval tasks. Must be used inside a runtime.
pub struct TokioAlarms {
    tx: mpsc::UnboundedSender<EngineEvent>,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl TokioAlarms {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            tx,
            tasks: DashMap::new(),
        }
    }

    /// Names of the scheduled alarms, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl AlarmService for TokioAlarms {
    fn schedule(&self, name: &str, period_minutes: u64) -> Result<(), PolicyError> {
        if period_minutes == 0 {
            return Err(PolicyError::InvalidConfig(format!(
                "alarm '{}' needs a period of at least one minute",
                name
            )));
        }
        // Clamped so the first deadline stays representable.
        let period = Duration::from_secs(period_minutes.min(MAX_PERIOD_MINUTES).saturating_mul(60));
        let tx = self.tx.clone();
        let alarm = name.to_string();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tracing::debug!(alarm = %alarm, "alarm fired");
                if tx.send(EngineEvent::AlarmFired(alarm.clone())).is_err() {
                    // Dispatcher is gone.
                    break;
                }
            }
        });

        if let Some(old) = self.tasks.insert(name.to_string(), handle) {
            old.abort();
        }
        tracing::debug!(alarm = %name, period_minutes, "alarm scheduled");
        Ok(())
    }

    fn clear(&self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn clear_all(&self) {
        for entry in self.tasks.iter() {
            entry.value().abort();
        }
        self.tasks.clear();
    }
}

impl Drop for TokioAlarms {
    fn drop(&mut self) {
        self.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alarms = TokioAlarms::new(tx);
        alarms.schedule("expiry-scan", 1).unwrap();

        time::advance(Duration::from_secs(59)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        time::advance(Duration::from_secs(2)).await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EngineEvent::AlarmFired(ref n) if n == "expiry-scan"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_stops_alarm() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alarms = TokioAlarms::new(tx);
        alarms.schedule("stale-reap", 1).unwrap();

        assert!(alarms.clear("stale-reap"));
        assert!(!alarms.clear("stale-reap"));

        time::advance(Duration::from_secs(180)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_period_is_clamped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let alarms = TokioAlarms::new(tx);
        alarms.schedule("stale-reap", u64::MAX).unwrap();
        assert_eq!(alarms.names(), vec!["stale-reap".to_string()]);

        time::advance(Duration::from_secs(24 * 3600)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert!(alarms.clear("stale-reap"));
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let alarms = TokioAlarms::new(tx);
        assert!(matches!(
            alarms.schedule("x", 0),
            Err(PolicyError::InvalidConfig(_))
        ));
        assert!(alarms.names().is_empty());
    }
}
