//! Guard coordinator
//!
//! Single entry point for everything that can destroy the vault. Hosts
//! report unlock attempts and periodic ticks; the coordinator runs every
//! guard in a fixed order, lets the first trip win, and executes at most
//! one wipe per trigger under an evaluation lock.
//!
//! Wipe staging is deliberate: the vault's cryptographic store is destroyed
//! first, then the `vault:` namespace is swept, then every guard resets to
//! defaults. Key material dies first so the payload is unreadable even if a
//! later stage fails.

pub mod outcome;

pub use outcome::{GuardOutcome, GuardStatus, InactivityWarning, WipeReport};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::guards::{
    AttemptCounterGuard, Guard, GuardEvent, InactivityGuard, SingleUseGuard, Verdict, WipeReason,
};
use crate::settings::{SettingsStore, WipeSummary};
use crate::vault::CredentialVault;
use deadbolt_store::{KeyValueStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Buffered outcomes a slow ticker consumer may fall behind by.
const TICKER_CHANNEL_CAPACITY: usize = 16;

pub struct GuardCoordinator {
    settings: Arc<SettingsStore>,
    attempts: Arc<AttemptCounterGuard>,
    single_use: Arc<SingleUseGuard>,
    inactivity: Arc<InactivityGuard>,
    /// Evaluation order. Attempt counting first, staleness last, and the
    /// first trip wins.
    guards: Vec<Arc<dyn Guard>>,
    vault: Arc<dyn CredentialVault>,
    clock: Arc<dyn Clock>,
    eval_lock: Mutex<()>,
}

impl GuardCoordinator {
    pub fn new(
        persistent: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        vault: Arc<dyn CredentialVault>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = Arc::new(SettingsStore::new(persistent, session, clock.clone()));
        let attempts = Arc::new(AttemptCounterGuard::new(settings.clone()));
        let single_use = Arc::new(SingleUseGuard::new(settings.clone()));
        let inactivity = Arc::new(InactivityGuard::new(settings.clone(), clock.clone()));

        let guards: Vec<Arc<dyn Guard>> =
            vec![attempts.clone(), single_use.clone(), inactivity.clone()];

        Self {
            settings,
            attempts,
            single_use,
            inactivity,
            guards,
            vault,
            clock,
            eval_lock: Mutex::new(()),
        }
    }

    /// Coordinator over in-process stores and the system clock, for tests
    /// and hosts that keep no durable state.
    pub fn in_memory(vault: Arc<dyn CredentialVault>) -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
            vault,
            Arc::new(SystemClock),
        )
    }

    /// The attempt counter, for host configuration surfaces.
    pub fn attempts(&self) -> &AttemptCounterGuard {
        &self.attempts
    }

    /// The single-use guard, for host configuration surfaces.
    pub fn single_use(&self) -> &SingleUseGuard {
        &self.single_use
    }

    /// The inactivity switch, for host configuration surfaces.
    pub fn inactivity(&self) -> &InactivityGuard {
        &self.inactivity
    }

    /// Run every guard against one unlock attempt.
    ///
    /// Call this for each attempt, successful or not, after the vault has
    /// verified the secret. At most one wipe executes regardless of how
    /// many guards would trip.
    pub async fn evaluate_unlock_attempt(&self, succeeded: bool) -> Result<GuardOutcome> {
        let _lock = self.eval_lock.lock().await;
        debug!("Evaluating unlock attempt (succeeded={})", succeeded);
        self.run(GuardEvent::UnlockAttempt { succeeded }).await
    }

    /// Run the time-based path with no unlock activity involved.
    pub async fn evaluate_tick(&self) -> Result<GuardOutcome> {
        let _lock = self.eval_lock.lock().await;
        self.run(GuardEvent::Tick).await
    }

    /// Mark the pending inactivity warning as seen by the operator.
    pub async fn acknowledge_warning(&self) -> Result<()> {
        let _lock = self.eval_lock.lock().await;
        self.inactivity.acknowledge_warning().await
    }

    /// Aggregate snapshot of every guard, read under the evaluation lock so
    /// it never interleaves with a wipe.
    pub async fn status(&self) -> Result<GuardStatus> {
        let _lock = self.eval_lock.lock().await;
        Ok(GuardStatus {
            failed_attempts: self.attempts.failed_attempts().await?,
            max_attempts: self.attempts.max_attempts().await?,
            inactivity_enabled: self.inactivity.is_enabled().await?,
            days_until_trigger: self.inactivity.days_until_trigger().await?,
            warning_pending: self.inactivity.should_warn().await?,
            single_use_enabled: self.single_use.is_enabled().await?,
            single_use_consumed: self.single_use.access_count().await? >= 1,
        })
    }

    async fn run(&self, event: GuardEvent) -> Result<GuardOutcome> {
        let mut warned = false;
        for guard in &self.guards {
            match guard.evaluate(&event).await? {
                Verdict::Pass => {}
                Verdict::Warn => {
                    debug!("Guard '{}' raised a warning", guard.name());
                    warned = true;
                }
                Verdict::Trip => {
                    info!("Guard '{}' tripped", guard.name());
                    return self.execute_wipe(guard.wipe_reason()).await;
                }
            }
        }

        if warned {
            let days = self.inactivity.days_until_trigger().await?;
            Ok(GuardOutcome::Warned(InactivityWarning {
                days_until_trigger: days,
            }))
        } else {
            Ok(GuardOutcome::Clean)
        }
    }

    /// Execute the wipe: vault first, namespace sweep second, guard reset
    /// last. Stage failures degrade the outcome instead of aborting it; a
    /// wipe that has started must take everything it still can.
    async fn execute_wipe(&self, reason: WipeReason) -> Result<GuardOutcome> {
        warn!("Vault wipe triggered: {:?}", reason);

        let vault_wiped = match self.vault.wipe().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Vault store refused to wipe: {}", e);
                false
            }
        };

        let summary = match self.settings.wipe_all_vault_keys().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Vault namespace sweep failed: {}", e);
                WipeSummary::default()
            }
        };

        self.reset_guards().await;

        let report = WipeReport {
            id: Uuid::new_v4(),
            reason,
            triggered_at: self.clock.now(),
            vault_wiped,
            removed_keys: summary.removed.len(),
            failed_keys: summary.failed,
            session_cleared: summary.session_cleared,
        };

        if report.is_complete() {
            info!(
                "Vault wipe complete: {} keys removed (report {})",
                report.removed_keys, report.id
            );
            Ok(GuardOutcome::Wiped(report))
        } else {
            warn!(
                "Vault wipe incomplete: vault_wiped={}, {} keys stuck (report {})",
                report.vault_wiped,
                report.failed_keys.len(),
                report.id
            );
            Ok(GuardOutcome::WipePartial(report))
        }
    }

    async fn reset_guards(&self) {
        for guard in &self.guards {
            if let Err(e) = guard.reset().await {
                warn!("Guard '{}' failed to reset after the wipe: {}", guard.name(), e);
            }
        }
    }
}

/// Drive [`GuardCoordinator::evaluate_tick`] on a fixed period, forwarding
/// every non-clean outcome to the returned receiver.
///
/// The task stops when the receiver is dropped. Missed ticks are skipped
/// rather than replayed; inactivity is measured from timestamps, so a burst
/// of catch-up ticks would add nothing.
pub fn spawn_ticker(
    coordinator: Arc<GuardCoordinator>,
    period: Duration,
) -> (JoinHandle<()>, mpsc::Receiver<GuardOutcome>) {
    let (tx, rx) = mpsc::channel(TICKER_CHANNEL_CAPACITY);
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            // Clean outcomes never send, so a dropped receiver has to be
            // noticed here or an all-quiet vault would tick forever.
            if tx.is_closed() {
                debug!("Ticker receiver dropped, stopping");
                break;
            }
            match coordinator.evaluate_tick().await {
                Ok(GuardOutcome::Clean) => {}
                Ok(outcome) => {
                    if tx.send(outcome).await.is_err() {
                        debug!("Ticker receiver dropped, stopping");
                        break;
                    }
                }
                Err(e) => warn!("Guard tick evaluation failed: {}", e),
            }
        }
    });
    (handle, rx)
}
