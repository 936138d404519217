//! Outcome types reported by guard evaluation

use crate::guards::WipeReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record of one wipe execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipeReport {
    /// Unique report id
    pub id: Uuid,
    /// Trigger that fired
    pub reason: WipeReason,
    /// Instant the wipe was issued
    pub triggered_at: DateTime<Utc>,
    /// Whether the vault's cryptographic store confirmed destruction
    pub vault_wiped: bool,
    /// Count of namespaced keys removed from the persistent store
    pub removed_keys: usize,
    /// Namespaced keys that could not be removed and still hold data
    pub failed_keys: Vec<String>,
    /// Whether the session-scoped store was cleared
    pub session_cleared: bool,
}

impl WipeReport {
    /// True when every stage of the wipe completed.
    pub fn is_complete(&self) -> bool {
        self.vault_wiped && self.failed_keys.is_empty() && self.session_cleared
    }
}

/// Details of a pending inactivity warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactivityWarning {
    /// Whole days left before the dead-man's switch trips
    pub days_until_trigger: i64,
}

/// Result of one coordinator evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// No trigger fired
    Clean,
    /// The inactivity warning window is open and unacknowledged
    Warned(InactivityWarning),
    /// A trigger fired and every wipe stage completed
    Wiped(WipeReport),
    /// A trigger fired but some wipe stage failed; data may remain
    WipePartial(WipeReport),
}

impl GuardOutcome {
    /// True for either wipe outcome. Partial or not, the vault is gone.
    pub fn is_wiped(&self) -> bool {
        matches!(self, GuardOutcome::Wiped(_) | GuardOutcome::WipePartial(_))
    }

    /// The wipe report, when a trigger fired.
    pub fn wipe_report(&self) -> Option<&WipeReport> {
        match self {
            GuardOutcome::Wiped(report) | GuardOutcome::WipePartial(report) => Some(report),
            _ => None,
        }
    }
}

/// Aggregate guard state for status surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardStatus {
    /// Consecutive failed unlock attempts so far
    pub failed_attempts: u32,
    /// Failures tolerated before the wipe
    pub max_attempts: u32,
    /// Whether the dead-man's switch is armed
    pub inactivity_enabled: bool,
    /// Days before the switch trips, or -1 when disarmed
    pub days_until_trigger: i64,
    /// Whether an unacknowledged inactivity warning is pending
    pub warning_pending: bool,
    /// Whether one-time access is armed
    pub single_use_enabled: bool,
    /// Whether the one-time grant has been consumed
    pub single_use_consumed: bool,
}
