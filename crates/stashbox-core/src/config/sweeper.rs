//! Retention and recovery sweeper configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sweeper schedule and retention thresholds.
///
/// The purge threshold for unresolved uploads is fixed at twice the
/// recovery threshold so a hard delete can never race the recovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the sweeper runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_period")]
    pub period_seconds: u64,
    /// Age in seconds after which an unresolved (`Pending`/`Failed`)
    /// upload is checked for recovery.
    #[serde(default = "default_stale_recovery")]
    pub stale_recovery_seconds: u64,
    /// Minimum age in seconds a soft-deleted row must reach before it is
    /// hard-deleted and its blob reclaimed.
    #[serde(default = "default_retention")]
    pub delete_retention_seconds: u64,
}

impl SweeperConfig {
    /// How long a sweep waits between runs.
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }

    /// Recovery threshold (T1) for unresolved uploads.
    pub fn stale_recovery(&self) -> Duration {
        Duration::from_secs(self.stale_recovery_seconds)
    }

    /// Purge threshold for unresolved uploads, always `2 * T1`.
    pub fn stale_purge(&self) -> Duration {
        Duration::from_secs(self.stale_recovery_seconds * 2)
    }

    /// Retention window for soft-deleted rows (T3).
    pub fn delete_retention(&self) -> Duration {
        Duration::from_secs(self.delete_retention_seconds)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period_seconds: default_period(),
            stale_recovery_seconds: default_stale_recovery(),
            delete_retention_seconds: default_retention(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_period() -> u64 {
    300 // 5 minutes
}

fn default_stale_recovery() -> u64 {
    3600 // 1 hour
}

fn default_retention() -> u64 {
    1800 // 30 minutes
}
