//! # Deadbolt Guard
//!
//! Self-destruct guards for a personal credential vault. The vault payload
//! is destroyed, not merely locked, when any armed trigger condition holds:
//!
//! - **Attempt counter**: too many consecutive failed unlock attempts
//! - **Single-use**: a vault armed for exactly one access is opened again
//! - **Inactivity**: a dead-man's switch trips after a configured idle window
//!
//! The [`GuardCoordinator`] owns the composition: hosts report unlock
//! attempts and periodic ticks to it, and it runs every guard in a fixed
//! order, executes at most one wipe per trigger, and reports what happened
//! as a [`GuardOutcome`].
//!
//! ## Architecture
//!
//! ```text
//! unlock attempt / tick
//!         │
//!         ▼
//! GuardCoordinator ──► AttemptCounterGuard ─┐
//!         │            SingleUseGuard       ├─ first Trip wins
//!         │            InactivityGuard     ─┘
//!         ▼
//! CredentialVault::wipe() + vault namespace sweep + guard reset
//! ```
//!
//! Guard state persists through [`SettingsStore`], which degrades to
//! default-valued, non-persisting behavior when no storage backend exists.
//! Time enters only through the injected [`Clock`], so every time-based
//! behavior is testable with [`ManualClock`].

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod guards;
pub mod settings;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    spawn_ticker, GuardCoordinator, GuardOutcome, GuardStatus, InactivityWarning, WipeReport,
};
pub use error::{GuardError, Result};
pub use guards::{
    AttemptCounterGuard, Guard, GuardEvent, InactivityGuard, SingleUseAccess, SingleUseGuard,
    Verdict, WipeReason,
};
pub use settings::{
    AttemptSettings, InactivitySettings, SettingsStore, SingleUseSettings, WipeSummary,
    VAULT_KEY_PREFIX,
};
pub use vault::{CredentialVault, WipeError};
