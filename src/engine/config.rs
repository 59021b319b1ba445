//! Engine configuration.

use crate::base::policyerror::PolicyError;
use crate::cookies::category::CookieCategory;
use serde::{Deserialize, Serialize};

/// Configuration options for the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Cookies expiring within this many minutes are offered for extension.
    pub near_expiry_horizon_minutes: u64,

    /// Cookies set to live longer than this are deleted by the stale reap.
    pub retention_ceiling_days: u64,

    /// How far "extend" pushes an expiration.
    pub extension_minutes: u64,

    /// Period of the `expiry-scan` alarm.
    pub expiry_scan_interval_minutes: u64,

    /// Period of the `stale-reap` alarm.
    pub stale_reap_interval_minutes: u64,

    /// Maximum retained audit entries.
    pub audit_capacity: usize,

    /// Categories encrypted even when the governing rule does not ask for it.
    pub category_encrypt_defaults: Vec<CookieCategory>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            near_expiry_horizon_minutes: 5,
            retention_ceiling_days: 30,
            extension_minutes: 60,
            expiry_scan_interval_minutes: 1,
            stale_reap_interval_minutes: 60,
            audit_capacity: 1000,
            category_encrypt_defaults: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config. Absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(json).map_err(|e| PolicyError::InvalidConfig(e.to_string()))
    }

    /// Check the sweep settings. The engine runs without a sweeper when this fails.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let checks = [
            ("nearExpiryHorizonMinutes", self.near_expiry_horizon_minutes),
            ("retentionCeilingDays", self.retention_ceiling_days),
            ("extensionMinutes", self.extension_minutes),
            ("expiryScanIntervalMinutes", self.expiry_scan_interval_minutes),
            ("staleReapIntervalMinutes", self.stale_reap_interval_minutes),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(PolicyError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    field
                )));
            }
        }
        Ok(())
    }

    pub fn horizon_secs(&self) -> i64 {
        minutes_to_secs(self.near_expiry_horizon_minutes)
    }

    pub fn retention_secs(&self) -> i64 {
        minutes_to_secs(self.retention_ceiling_days.saturating_mul(24 * 60))
    }

    pub fn extension_secs(&self) -> i64 {
        minutes_to_secs(self.extension_minutes)
    }

    pub fn encrypts_category(&self, category: CookieCategory) -> bool {
        self.category_encrypt_defaults.contains(&category)
    }
}

fn minutes_to_secs(minutes: u64) -> i64 {
    i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX)
}
