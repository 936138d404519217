//! Guard implementations and the capability they share
//!
//! Each guard owns exactly one persisted settings record and one trigger
//! condition. Guards decide, the coordinator acts: a guard returns
//! [`Verdict::Trip`] and the [`GuardCoordinator`](crate::GuardCoordinator)
//! executes the wipe, so no trigger can fire twice or race another.

pub mod attempt_counter;
pub mod inactivity;
pub mod single_use;

pub use attempt_counter::AttemptCounterGuard;
pub use inactivity::InactivityGuard;
pub use single_use::{SingleUseAccess, SingleUseGuard};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Event driving one guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardEvent {
    /// The vault processed an unlock attempt.
    UnlockAttempt {
        /// Whether the attempt opened the vault
        succeeded: bool,
    },
    /// Periodic timer fired; no unlock activity involved.
    Tick,
}

/// Verdict returned by a single guard for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to report
    Pass,
    /// A warning window is open and unacknowledged
    Warn,
    /// The trigger condition holds and the vault must be wiped
    Trip,
}

/// Why a wipe fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WipeReason {
    /// Consecutive failed unlock attempts reached the configured threshold
    AttemptsExceeded,
    /// A single-use vault was accessed after its one grant was consumed
    SingleUseExceeded,
    /// The inactivity window elapsed without a successful unlock
    Inactivity,
}

/// Capability shared by every guard.
#[async_trait]
pub trait Guard: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Reason attached to the wipe report when this guard trips.
    fn wipe_reason(&self) -> WipeReason;

    /// Evaluate the guard against `event`, updating persisted state as the
    /// event demands.
    async fn evaluate(&self, event: &GuardEvent) -> Result<Verdict>;

    /// Restore the guard's settings record to defaults. Issued once after
    /// every wipe so a future vault starts from a clean slate.
    async fn reset(&self) -> Result<()>;
}
