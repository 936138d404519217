//! Restart recovery tests
//!
//! The guards only deter an attacker if their state survives a process
//! restart: killing the app between guesses must not refill the attempt
//! budget, and a consumed single-use grant must stay consumed.

use anyhow::Result;
use chrono::{Duration, Utc};
use deadbolt_e2e_tests::{init_tracing, RecordingVault};
use deadbolt_guard::{GuardCoordinator, GuardOutcome, ManualClock, WipeReason};
use deadbolt_store::{KeyValueStore, MemoryStore, SledStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn open_coordinator(
    path: &Path,
    clock: Arc<ManualClock>,
    vault: Arc<RecordingVault>,
) -> Result<(Arc<SledStore>, GuardCoordinator)> {
    let store = Arc::new(SledStore::open(path)?);
    let coordinator =
        GuardCoordinator::new(store.clone(), Arc::new(MemoryStore::new()), vault, clock);
    Ok((store, coordinator))
}

#[tokio::test]
async fn test_attempt_counter_survives_restart() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());

    // Phase 1: three failed guesses, then the process dies.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;
        for _ in 0..3 {
            let outcome = coordinator.evaluate_unlock_attempt(false).await?;
            assert!(matches!(outcome, GuardOutcome::Clean));
        }
        store.flush()?;
    } // store dropped, database closed
    tracing::info!("✓ Three failures persisted before shutdown");

    // Phase 2: reopen; the counter picks up where it left off.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let raw = store
            .get("vault:guard:attempts")
            .await?
            .expect("counter record must be on disk");
        let record: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(record["failed_attempts"], 3);

        let outcome = coordinator.evaluate_unlock_attempt(false).await?;
        assert!(matches!(outcome, GuardOutcome::Clean), "fourth attempt");

        let outcome = coordinator.evaluate_unlock_attempt(false).await?;
        let report = outcome
            .wipe_report()
            .expect("fifth failure across restarts must wipe");
        assert_eq!(report.reason, WipeReason::AttemptsExceeded);
        store.flush()?;
    }
    tracing::info!("✓ Fifth failure across restarts wiped the vault");

    assert_eq!(vault.wipe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_corrupt_counter_record_degrades_to_defaults() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());

    // Phase 1: two failed guesses put a real record on disk.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;
        for _ in 0..2 {
            coordinator.evaluate_unlock_attempt(false).await?;
        }
        store.flush()?;
    }

    // Phase 2: the record's bytes rot on disk. Planted through the raw sled
    // handle because the store API only accepts valid strings.
    {
        let db = sled::open(&db_path)?;
        let tree = db.open_tree("deadbolt_kv")?;
        let live = tree
            .get("vault:guard:attempts")?
            .expect("counter record must be on disk");
        assert!(std::str::from_utf8(&live)?.contains("\"failed_attempts\":2"));

        let garbage: &[u8] = &[0xFF, 0xFE, 0xFD];
        tree.insert("vault:guard:attempts", garbage)?;
        tree.flush()?;
    }
    tracing::info!("✓ Counter record replaced with invalid UTF-8");

    // Phase 3: reopening must shrug off the damage, report stock settings,
    // and count from zero instead of erroring on every attempt.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let status = coordinator.status().await?;
        assert_eq!(status.failed_attempts, 0);
        assert_eq!(status.max_attempts, 5);

        for _ in 0..4 {
            let outcome = coordinator.evaluate_unlock_attempt(false).await?;
            assert!(matches!(outcome, GuardOutcome::Clean));
        }
        store.flush()?;
    }
    tracing::info!("✓ Vault reopened with stock settings and kept counting");

    assert_eq!(vault.wipe_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_inactivity_window_survives_restart() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());
    let t0 = Utc::now();

    // Phase 1: arm the dead-man's switch and walk away.
    {
        let clock = Arc::new(ManualClock::new(t0));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;
        coordinator.inactivity().set_enabled(true).await?;
        store.flush()?;
    }

    // Phase 2: the machine comes back three months later. The expiry has
    // never been seen, so the first tick warns instead of wiping.
    {
        let clock = Arc::new(ManualClock::new(t0 + Duration::days(91)));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let outcome = coordinator.evaluate_tick().await?;
        assert!(matches!(outcome, GuardOutcome::Warned(_)));

        coordinator.acknowledge_warning().await?;
        let outcome = coordinator.evaluate_tick().await?;
        let report = outcome.wipe_report().expect("expired vault must wipe");
        assert_eq!(report.reason, WipeReason::Inactivity);
        store.flush()?;
    }
    tracing::info!("✓ Expiry discovered on reopen: warned once, then wiped");

    assert_eq!(vault.wipe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_warning_acknowledgement_survives_restart() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());
    let t0 = Utc::now();

    {
        let clock = Arc::new(ManualClock::new(t0));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;
        coordinator.inactivity().set_enabled(true).await?;
        store.flush()?;
    }

    // Day 85: warning seen and acknowledged, then the process dies.
    {
        let clock = Arc::new(ManualClock::new(t0 + Duration::days(85)));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let outcome = coordinator.evaluate_tick().await?;
        assert!(matches!(outcome, GuardOutcome::Warned(_)));
        coordinator.acknowledge_warning().await?;
        store.flush()?;
    }
    tracing::info!("✓ Warning acknowledged at day 85 and persisted");

    // Day 92: the acknowledgement was persisted, so the wipe proceeds
    // without demanding a second look.
    {
        let clock = Arc::new(ManualClock::new(t0 + Duration::days(92)));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let outcome = coordinator.evaluate_tick().await?;
        assert!(outcome.is_wiped());
        store.flush()?;
    }

    assert_eq!(vault.wipe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_single_use_grant_survives_restart() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());

    // Phase 1: arm one-time access; the recipient opens the vault once.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;
        coordinator.single_use().enable().await?;

        let outcome = coordinator.evaluate_unlock_attempt(true).await?;
        assert!(matches!(outcome, GuardOutcome::Clean));
        store.flush()?;
    }

    // Phase 2: after a restart the grant is still consumed.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let outcome = coordinator.evaluate_unlock_attempt(true).await?;
        let report = outcome
            .wipe_report()
            .expect("second unlock after restart must wipe");
        assert_eq!(report.reason, WipeReason::SingleUseExceeded);
        store.flush()?;
    }
    tracing::info!("✓ Consumed grant still consumed after restart");

    assert_eq!(vault.wipe_count(), 1);
    Ok(())
}
