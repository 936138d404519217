//! One-time vault access guard
//!
//! For hand-off scenarios: the vault is armed to survive exactly one
//! successful unlock (a recovery code picked up by a relative, a one-shot
//! credential drop). The second unlock proves the hand-off either already
//! happened or the vault fell into the wrong hands; both mean wipe.

use crate::error::Result;
use crate::settings::{SettingsStore, SingleUseSettings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Guard, GuardEvent, Verdict, WipeReason};

/// Disposition of one recorded access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleUseAccess {
    /// The guard is disarmed; accesses are not being counted
    Disarmed,
    /// The one legitimate access of this arming cycle
    Granted,
    /// An access past the grant; the vault is wipe-eligible
    Exhausted,
}

pub struct SingleUseGuard {
    settings: Arc<SettingsStore>,
}

impl SingleUseGuard {
    pub fn new(settings: Arc<SettingsStore>) -> Self {
        Self { settings }
    }

    /// Arm one-time access, starting a fresh cycle with a zero counter.
    ///
    /// Arming an already-armed guard changes nothing: a consumed grant
    /// cannot be re-minted by flipping the switch again.
    pub async fn enable(&self) -> Result<()> {
        let mut settings = self.settings.read_single_use().await?;
        if settings.enabled {
            debug!("Single-use guard already armed, keeping its counter");
            return Ok(());
        }
        settings.enabled = true;
        settings.access_count = 0;
        self.settings.write_single_use(&settings).await?;
        info!("Single-use guard armed");
        Ok(())
    }

    /// Disarm the guard and discard the counter.
    pub async fn disable(&self) -> Result<()> {
        let mut settings = self.settings.read_single_use().await?;
        if !settings.enabled && settings.access_count == 0 {
            return Ok(());
        }
        settings.enabled = false;
        settings.access_count = 0;
        self.settings.write_single_use(&settings).await?;
        info!("Single-use guard disarmed");
        Ok(())
    }

    /// Count one successful access and report its disposition.
    pub async fn record_access(&self) -> Result<SingleUseAccess> {
        let mut settings = self.settings.read_single_use().await?;
        if !settings.enabled {
            return Ok(SingleUseAccess::Disarmed);
        }

        settings.access_count = settings.access_count.saturating_add(1);
        self.settings.write_single_use(&settings).await?;

        if settings.access_count == 1 {
            info!("Single-use access granted");
            Ok(SingleUseAccess::Granted)
        } else {
            warn!("Single-use vault accessed again after its grant was consumed");
            Ok(SingleUseAccess::Exhausted)
        }
    }

    /// True when an access past the grant has been observed.
    pub async fn should_self_destruct(&self) -> Result<bool> {
        let settings = self.settings.read_single_use().await?;
        Ok(settings.enabled && settings.access_count > 1)
    }

    /// Whether one-time access is armed.
    pub async fn is_enabled(&self) -> Result<bool> {
        Ok(self.settings.read_single_use().await?.enabled)
    }

    /// Accesses observed since arming.
    pub async fn access_count(&self) -> Result<u32> {
        Ok(self.settings.read_single_use().await?.access_count)
    }
}

#[async_trait]
impl Guard for SingleUseGuard {
    fn name(&self) -> &'static str {
        "single_use"
    }

    fn wipe_reason(&self) -> WipeReason {
        WipeReason::SingleUseExceeded
    }

    async fn evaluate(&self, event: &GuardEvent) -> Result<Verdict> {
        match event {
            GuardEvent::UnlockAttempt { succeeded: true } => {
                match self.record_access().await? {
                    SingleUseAccess::Exhausted => Ok(Verdict::Trip),
                    SingleUseAccess::Granted | SingleUseAccess::Disarmed => Ok(Verdict::Pass),
                }
            }
            // Failed attempts are not accesses; the attempt counter owns those.
            GuardEvent::UnlockAttempt { succeeded: false } => Ok(Verdict::Pass),
            GuardEvent::Tick => Ok(Verdict::Pass),
        }
    }

    async fn reset(&self) -> Result<()> {
        self.settings
            .write_single_use(&SingleUseSettings::default())
            .await
    }
}
