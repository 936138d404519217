//! Persisted guard settings and the adapter that isolates storage faults
//!
//! Each guard owns one JSON record under the `vault:` namespace. The
//! [`SettingsStore`] adapter sits between the guards and the raw
//! [`KeyValueStore`]: reads absorb absence, malformed records, out-of-range
//! values, and a missing backend by returning defaults; writes tolerate a
//! missing backend by dropping the write. A vault that cannot persist its
//! guard state still guards, it just starts fresh each process.

use crate::clock::Clock;
use crate::error::Result;
use chrono::{DateTime, Utc};
use deadbolt_store::{KeyValueStore, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Namespace prefix of every key the vault persists. The wipe sweep removes
/// exactly this namespace and nothing else.
pub const VAULT_KEY_PREFIX: &str = "vault:";

/// Key of the attempt counter record
pub(crate) const ATTEMPTS_KEY: &str = "vault:guard:attempts";
/// Key of the inactivity record
pub(crate) const INACTIVITY_KEY: &str = "vault:guard:inactivity";
/// Key of the single-use record
pub(crate) const SINGLE_USE_KEY: &str = "vault:guard:single_use";

/// Default failed-attempt threshold
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default inactivity trigger threshold, in days
pub const DEFAULT_INACTIVE_THRESHOLD_DAYS: u32 = 90;
/// Default width of the pre-trigger warning window, in days
pub const DEFAULT_WARNING_THRESHOLD_DAYS: u32 = 7;

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_inactive_threshold() -> u32 {
    DEFAULT_INACTIVE_THRESHOLD_DAYS
}

fn default_warning_threshold() -> u32 {
    DEFAULT_WARNING_THRESHOLD_DAYS
}

/// Attempt counter record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSettings {
    /// Consecutive failed unlock attempts since the last reset
    #[serde(default)]
    pub failed_attempts: u32,
    /// Failures tolerated before the wipe trips
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self {
            failed_attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl AttemptSettings {
    /// A threshold of zero would wipe on the first failure ever recorded,
    /// so such a record is treated as corrupt.
    fn is_valid(&self) -> bool {
        self.max_attempts >= 1
    }
}

/// Inactivity (dead-man's switch) record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivitySettings {
    /// Whether the dead-man's switch is armed
    #[serde(default)]
    pub enabled: bool,
    /// Idle days after which the vault wipes
    #[serde(default = "default_inactive_threshold")]
    pub inactive_threshold_days: u32,
    /// Instant of the last successful unlock. Required in stored records; a
    /// record without it is treated as corrupt rather than guessed at.
    pub last_access: DateTime<Utc>,
    /// Days before the trigger at which warnings begin
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_days: u32,
    /// Whether the operator has seen the current warning
    #[serde(default)]
    pub warning_acknowledged: bool,
}

impl InactivitySettings {
    /// Default record anchored at `now`: disarmed, stock thresholds, window
    /// starting from the current instant.
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            enabled: false,
            inactive_threshold_days: DEFAULT_INACTIVE_THRESHOLD_DAYS,
            last_access: now,
            warning_threshold_days: DEFAULT_WARNING_THRESHOLD_DAYS,
            warning_acknowledged: false,
        }
    }

    fn is_valid(&self) -> bool {
        self.inactive_threshold_days >= 1
            && self.warning_threshold_days >= 1
            && self.warning_threshold_days < self.inactive_threshold_days
    }
}

/// Single-use vault record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleUseSettings {
    /// Whether one-time access is armed
    pub enabled: bool,
    /// Successful accesses observed since arming
    pub access_count: u32,
}

/// Result of sweeping the vault namespace out of the stores.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WipeSummary {
    /// Keys removed from the persistent store
    pub removed: Vec<String>,
    /// Keys that could not be removed and still hold data
    pub failed: Vec<String>,
    /// Whether the session-scoped store was cleared
    pub session_cleared: bool,
}

impl WipeSummary {
    /// True when every namespaced key was removed and the session cleared.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.session_cleared
    }
}

/// Adapter between the guards and the underlying key-value stores.
///
/// Owns two stores: the persistent one holding the guard records and the
/// vault payload, and a session-scoped one holding decrypted state that
/// must also die on wipe. The injected [`Clock`] anchors default inactivity
/// records at the current instant.
pub struct SettingsStore {
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl SettingsStore {
    pub fn new(
        persistent: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            persistent,
            session,
            clock,
        }
    }

    /// Read the attempt counter record, falling back to defaults.
    pub async fn read_attempts(&self) -> Result<AttemptSettings> {
        match self.read_record::<AttemptSettings>(ATTEMPTS_KEY).await? {
            Some(settings) if settings.is_valid() => Ok(settings),
            Some(_) => {
                warn!("Out-of-range attempt settings replaced with defaults");
                Ok(AttemptSettings::default())
            }
            None => Ok(AttemptSettings::default()),
        }
    }

    /// Persist the attempt counter record.
    pub async fn write_attempts(&self, settings: &AttemptSettings) -> Result<()> {
        self.write_record(ATTEMPTS_KEY, settings).await
    }

    /// Read the inactivity record. The fallback is anchored at the current
    /// instant so a fresh vault is never instantly idle-expired.
    pub async fn read_inactivity(&self) -> Result<InactivitySettings> {
        match self
            .read_record::<InactivitySettings>(INACTIVITY_KEY)
            .await?
        {
            Some(settings) if settings.is_valid() => Ok(settings),
            Some(_) => {
                warn!("Out-of-range inactivity settings replaced with defaults");
                Ok(InactivitySettings::new_at(self.clock.now()))
            }
            None => Ok(InactivitySettings::new_at(self.clock.now())),
        }
    }

    /// Persist the inactivity record.
    pub async fn write_inactivity(&self, settings: &InactivitySettings) -> Result<()> {
        self.write_record(INACTIVITY_KEY, settings).await
    }

    /// Read the single-use record, falling back to defaults.
    pub async fn read_single_use(&self) -> Result<SingleUseSettings> {
        Ok(self
            .read_record::<SingleUseSettings>(SINGLE_USE_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Persist the single-use record.
    pub async fn write_single_use(&self, settings: &SingleUseSettings) -> Result<()> {
        self.write_record(SINGLE_USE_KEY, settings).await
    }

    /// Remove every persisted key under the vault namespace and clear the
    /// session store. Per-key failures are collected rather than
    /// short-circuiting: one stubborn key must not shield the rest.
    pub async fn wipe_all_vault_keys(&self) -> Result<WipeSummary> {
        let keys = match self.persistent.keys_with_prefix(VAULT_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(StoreError::Unavailable) => {
                debug!("No storage backend, nothing persisted to wipe");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut summary = WipeSummary::default();
        for key in keys {
            match self.persistent.remove(&key).await {
                Ok(()) => summary.removed.push(key),
                Err(e) => {
                    warn!("Failed to remove {} during wipe: {}", key, e);
                    summary.failed.push(key);
                }
            }
        }

        summary.session_cleared = match self.session.clear().await {
            Ok(()) => true,
            // No session scope exists, so there is nothing left to clear.
            Err(StoreError::Unavailable) => true,
            Err(e) => {
                warn!("Failed to clear session store during wipe: {}", e);
                false
            }
        };

        Ok(summary)
    }

    async fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = match self.persistent.get(key).await {
            Ok(value) => value,
            Err(StoreError::Unavailable) => {
                debug!("No storage backend, using defaults for {}", key);
                return Ok(None);
            }
            // Bytes that no longer decode are the same local damage as a
            // record that no longer parses: fall back, do not surface.
            Err(StoreError::Serialization(e)) => {
                warn!("Undecodable settings record {}: {}", key, e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                warn!("Malformed settings record {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn write_record<T: Serialize>(&self, key: &str, settings: &T) -> Result<()> {
        let raw = serde_json::to_string(settings)
            .map_err(|e| StoreError::Serialization(format!("Failed to encode {}: {}", key, e)))?;

        match self.persistent.set(key, &raw).await {
            Ok(()) => Ok(()),
            Err(StoreError::Unavailable) => {
                debug!("No storage backend, dropped write for {}", key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
