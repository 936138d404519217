//! Full wipe flow tests over durable storage
//!
//! Verify what a wipe actually leaves on disk: the vault namespace gone,
//! everything else intact, and default guard records ready for whatever
//! vault the owner creates next.

use anyhow::Result;
use chrono::{Duration, Utc};
use deadbolt_e2e_tests::{init_tracing, RecordingVault};
use deadbolt_guard::{GuardCoordinator, GuardOutcome, ManualClock};
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
async fn test_wipe_sweeps_disk_but_leaves_unrelated_data() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());

    // Phase 1: a populated store takes five bad guesses.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        store.set("vault:payload", "ciphertext").await?;
        store.set("vault:recorder:login_script", "steps").await?;
        store.set("profile:locale", "en-GB").await?;

        let mut last = GuardOutcome::Clean;
        for _ in 0..5 {
            last = coordinator.evaluate_unlock_attempt(false).await?;
        }
        let report = last.wipe_report().expect("fifth failure must wipe");
        // Payload, recorder script, and the counter record; the other guard
        // records were never written because nothing armed them.
        assert_eq!(report.removed_keys, 3);
        store.flush()?;
    }
    tracing::info!("✓ Wipe swept the vault namespace on disk");

    // Phase 2: reopen and audit the disk.
    {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, _coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        assert_eq!(store.get("vault:payload").await?, None);
        assert_eq!(store.get("vault:recorder:login_script").await?, None);
        assert_eq!(
            store.get("profile:locale").await?,
            Some("en-GB".to_string())
        );

        // Guard records were re-seeded with defaults for the next vault.
        let raw = store
            .get("vault:guard:attempts")
            .await?
            .expect("default counter record must exist after the wipe");
        let record: serde_json::Value = serde_json::from_str(&raw)?;
        assert_eq!(record["failed_attempts"], 0);
        assert_eq!(record["max_attempts"], 5);
    }
    tracing::info!("✓ Unrelated data survived and defaults were re-seeded");

    assert_eq!(vault.wipe_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_checked_in_vault_keeps_running() -> Result<()> {
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

    // Day 85: the owner sees the warning and simply unlocks the vault.
    {
        let clock = Arc::new(ManualClock::new(t0 + Duration::days(85)));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let outcome = coordinator.evaluate_tick().await?;
        assert!(matches!(outcome, GuardOutcome::Warned(_)));

        let outcome = coordinator.evaluate_unlock_attempt(true).await?;
        assert!(matches!(outcome, GuardOutcome::Clean));

        // The window restarted; nothing pending anymore.
        let outcome = coordinator.evaluate_tick().await?;
        assert!(matches!(outcome, GuardOutcome::Clean));
        let status = coordinator.status().await?;
        assert_eq!(status.days_until_trigger, 90);
        store.flush()?;
    }
    tracing::info!("✓ Check-in at day 85 restarted the inactivity window");

    // Day 170 (85 days after the check-in): still alive and well.
    {
        let clock = Arc::new(ManualClock::new(t0 + Duration::days(170)));
        let (store, coordinator) = open_coordinator(&db_path, clock, vault.clone())?;

        let outcome = coordinator.evaluate_tick().await?;
        assert!(matches!(outcome, GuardOutcome::Warned(_)));
        assert_eq!(vault.wipe_count(), 0);
        store.flush()?;
    }

    Ok(())
}

#[tokio::test]
async fn test_fresh_vault_cycle_after_a_wipe() -> Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let db_path = dir.path().join("deadbolt-db");
    let vault = Arc::new(RecordingVault::new());

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let (store, coordinator) = open_coordinator(&db_path, clock.clone(), vault.clone())?;

    // First vault dies to brute force.
    coordinator.attempts().set_max_attempts(3).await?;
    for _ in 0..3 {
        coordinator.evaluate_unlock_attempt(false).await?;
    }
    assert_eq!(vault.wipe_count(), 1);

    // The owner starts over on the same store: stock settings, a working
    // single-use flow, and a full attempt budget.
    coordinator.single_use().enable().await?;
    let outcome = coordinator.evaluate_unlock_attempt(true).await?;
    assert!(matches!(outcome, GuardOutcome::Clean));

    for _ in 0..4 {
        let outcome = coordinator.evaluate_unlock_attempt(false).await?;
        assert!(matches!(outcome, GuardOutcome::Clean));
    }
    tracing::info!("✓ Fresh vault cycle runs on stock settings after a wipe");

    store.flush()?;
    Ok(())
}
