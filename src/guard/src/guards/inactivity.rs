//! Inactivity dead-man's switch
//!
//! Wipes the vault after a configured number of idle days, on the theory
//! that a long-untouched credential vault is more likely lost, stolen, or
//! abandoned than in careful daily use. A warning window opens before the
//! trigger so an operator who is merely on holiday can check in.

use crate::clock::Clock;
use crate::error::{GuardError, Result};
use crate::settings::{InactivitySettings, SettingsStore};
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Guard, GuardEvent, Verdict, WipeReason};

/// Returned by [`InactivityGuard::days_until_trigger`] when the switch is
/// disarmed.
pub const DAYS_DISABLED: i64 = -1;

const MILLIS_PER_DAY: i64 = 86_400_000;

pub struct InactivityGuard {
    settings: Arc<SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl InactivityGuard {
    pub fn new(settings: Arc<SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    /// True when the switch is armed and the vault has been idle for the
    /// full threshold.
    pub async fn should_trigger(&self) -> Result<bool> {
        let settings = self.settings.read_inactivity().await?;
        Ok(settings.enabled && self.elapsed(&settings) >= Self::trigger_window(&settings))
    }

    /// True when the warning window is open and the operator has not yet
    /// acknowledged it.
    pub async fn should_warn(&self) -> Result<bool> {
        let settings = self.settings.read_inactivity().await?;
        Ok(settings.enabled
            && !settings.warning_acknowledged
            && self.elapsed(&settings) >= Self::warning_window(&settings))
    }

    /// Whole days left before the trigger instant, rounded up so a partial
    /// day still counts as a day, and floored at zero once the instant has
    /// passed. Returns [`DAYS_DISABLED`] when the switch is disarmed.
    pub async fn days_until_trigger(&self) -> Result<i64> {
        let settings = self.settings.read_inactivity().await?;
        if !settings.enabled {
            return Ok(DAYS_DISABLED);
        }

        let remaining = Self::trigger_window(&settings) - self.elapsed(&settings);
        let remaining_ms = remaining.num_milliseconds();
        if remaining_ms <= 0 {
            return Ok(0);
        }
        Ok((remaining_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY)
    }

    /// Stamp a successful unlock: the idle window restarts and any pending
    /// warning acknowledgement is cleared for the next cycle.
    pub async fn record_access(&self) -> Result<()> {
        let mut settings = self.settings.read_inactivity().await?;
        settings.last_access = self.clock.now();
        settings.warning_acknowledged = false;
        self.settings.write_inactivity(&settings).await
    }

    /// Mark the current warning as seen without touching the idle window.
    /// Acknowledging postpones nothing; only an unlock does that.
    pub async fn acknowledge_warning(&self) -> Result<()> {
        let mut settings = self.settings.read_inactivity().await?;
        if settings.warning_acknowledged {
            return Ok(());
        }
        settings.warning_acknowledged = true;
        self.settings.write_inactivity(&settings).await
    }

    /// Arm or disarm the dead-man's switch.
    ///
    /// Arming stamps the current instant, so a switch that sat disarmed for
    /// a year cannot trip the moment it is turned on.
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut settings = self.settings.read_inactivity().await?;
        if settings.enabled == enabled {
            return Ok(());
        }
        settings.enabled = enabled;
        if enabled {
            settings.last_access = self.clock.now();
            settings.warning_acknowledged = false;
        }
        self.settings.write_inactivity(&settings).await?;
        info!(
            "Inactivity switch {}",
            if enabled { "armed" } else { "disarmed" }
        );
        Ok(())
    }

    /// Reconfigure the trigger and warning thresholds, in days. The warning
    /// window must open strictly before the trigger instant.
    pub async fn set_thresholds(&self, inactive_days: u32, warning_days: u32) -> Result<()> {
        if inactive_days == 0 {
            return Err(GuardError::Config(
                "inactive threshold must be at least 1 day".to_string(),
            ));
        }
        if warning_days == 0 || warning_days >= inactive_days {
            return Err(GuardError::Config(format!(
                "warning threshold must be between 1 and {} days",
                inactive_days - 1
            )));
        }

        let mut settings = self.settings.read_inactivity().await?;
        settings.inactive_threshold_days = inactive_days;
        settings.warning_threshold_days = warning_days;
        self.settings.write_inactivity(&settings).await
    }

    /// Whether the switch is armed.
    pub async fn is_enabled(&self) -> Result<bool> {
        Ok(self.settings.read_inactivity().await?.enabled)
    }

    fn elapsed(&self, settings: &InactivitySettings) -> Duration {
        self.clock.now().signed_duration_since(settings.last_access)
    }

    fn trigger_window(settings: &InactivitySettings) -> Duration {
        Duration::days(settings.inactive_threshold_days as i64)
    }

    fn warning_window(settings: &InactivitySettings) -> Duration {
        Duration::days((settings.inactive_threshold_days - settings.warning_threshold_days) as i64)
    }
}

#[async_trait]
impl Guard for InactivityGuard {
    fn name(&self) -> &'static str {
        "inactivity"
    }

    fn wipe_reason(&self) -> WipeReason {
        WipeReason::Inactivity
    }

    async fn evaluate(&self, event: &GuardEvent) -> Result<Verdict> {
        match event {
            GuardEvent::UnlockAttempt { succeeded: true } => {
                // A stale vault wipes even when the correct secret arrives;
                // checking in one day too late is still too late.
                if self.should_trigger().await? {
                    return Ok(Verdict::Trip);
                }
                self.record_access().await?;
                Ok(Verdict::Pass)
            }
            GuardEvent::UnlockAttempt { succeeded: false } => {
                // Failed attempts never refresh the idle window.
                if self.should_trigger().await? {
                    Ok(Verdict::Trip)
                } else {
                    Ok(Verdict::Pass)
                }
            }
            GuardEvent::Tick => {
                // An unacknowledged warning holds the trigger off so the
                // operator is guaranteed to see at least one warning before
                // the vault destroys itself.
                if self.should_warn().await? {
                    debug!("Inactivity warning window is open");
                    return Ok(Verdict::Warn);
                }
                if self.should_trigger().await? {
                    return Ok(Verdict::Trip);
                }
                Ok(Verdict::Pass)
            }
        }
    }

    async fn reset(&self) -> Result<()> {
        self.settings
            .write_inactivity(&InactivitySettings::new_at(self.clock.now()))
            .await
    }
}
