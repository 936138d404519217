//! Failed-unlock attempt counter

use crate::error::{GuardError, Result};
use crate::settings::{AttemptSettings, SettingsStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Guard, GuardEvent, Verdict, WipeReason};

/// Counts consecutive failed unlock attempts and trips at the threshold.
///
/// The counter persists across restarts, so closing and reopening the vault
/// between guesses buys an attacker nothing. A successful unlock resets it.
pub struct AttemptCounterGuard {
    settings: Arc<SettingsStore>,
}

impl AttemptCounterGuard {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    /// Record one failed unlock attempt.
    ///
    /// Returns `true` when the incremented counter reached the threshold.
    /// The caller owns the wipe that must follow; this guard only counts.
    /// The read-increment-write sequence relies on the coordinator's
    /// evaluation lock for exclusivity.
    pub async fn record_failed_attempt(&self) -> Result<bool> {
        let mut settings = self.settings.read_attempts().await?;
        settings.failed_attempts = settings.failed_attempts.saturating_add(1);
        self.settings.write_attempts(&settings).await?;

        let tripped = settings.failed_attempts >= settings.max_attempts;
        if tripped {
            info!(
                "Failed unlock attempts reached the threshold ({}/{})",
                settings.failed_attempts, settings.max_attempts
            );
        } else {
            debug!(
                "Failed unlock attempt {}/{}",
                settings.failed_attempts, settings.max_attempts
            );
        }
        Ok(tripped)
    }

    /// Reset the counter after a successful unlock.
    pub async fn record_successful_unlock(&self) -> Result<()> {
        let mut settings = self.settings.read_attempts().await?;
        if settings.failed_attempts == 0 {
            return Ok(());
        }
        settings.failed_attempts = 0;
        self.settings.write_attempts(&settings).await
    }

    /// Current counter value.
    pub async fn failed_attempts(&self) -> Result<u32> {
        Ok(self.settings.read_attempts().await?.failed_attempts)
    }

    /// Configured threshold.
    pub async fn max_attempts(&self) -> Result<u32> {
        Ok(self.settings.read_attempts().await?.max_attempts)
    }

    /// Change the threshold. Zero is rejected: it would wipe the vault on
    /// the first failure ever recorded.
    pub async fn set_max_attempts(&self, max_attempts: u32) -> Result<()> {
        if max_attempts == 0 {
            return Err(GuardError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let mut settings = self.settings.read_attempts().await?;
        settings.max_attempts = max_attempts;
        self.settings.write_attempts(&settings).await
    }
}

#[async_trait]
impl Guard for AttemptCounterGuard {
    fn name(&self) -> &'static str {
        "attempt_counter"
    }

    fn wipe_reason(&self) -> WipeReason {
        WipeReason::AttemptsExceeded
    }

    async fn evaluate(&self, event: &GuardEvent) -> Result<Verdict> {
        match event {
            GuardEvent::UnlockAttempt { succeeded: false } => {
                if self.record_failed_attempt().await? {
                    Ok(Verdict::Trip)
                } else {
                    Ok(Verdict::Pass)
                }
            }
            GuardEvent::UnlockAttempt { succeeded: true } => {
                self.record_successful_unlock().await?;
                Ok(Verdict::Pass)
            }
            GuardEvent::Tick => Ok(Verdict::Pass),
        }
    }

    async fn reset(&self) -> Result<()> {
        self.settings.write_attempts(&AttemptSettings::default()).await
    }
}
