//! Seed creators from configuration
//!
//! Gives the first backfill run something to walk before any feed or browse
//! discovery has happened. Re-running is harmless: existing handles are
//! skipped.

use crate::config::SeedEntry;
use crate::storage::{SqliteStore, StageReport, Store, UpsertOutcome};
use std::sync::{Arc, Mutex};

/// Upserts every configured seed creator.
pub fn seed_parents(
    store: &Arc<Mutex<SqliteStore>>,
    seeds: &[SeedEntry],
) -> crate::Result<StageReport> {
    let mut report = StageReport::default();
    let mut added = 0u32;

    let mut store = store.lock().unwrap();
    for seed in seeds {
        let (_, outcome) = store.upsert_parent(&seed.handle, &seed.profile_url)?;
        if outcome == UpsertOutcome::Applied {
            tracing::info!("Seeded creator: {}", seed.handle);
            added += 1;
        }
        report.success();
    }

    if !seeds.is_empty() {
        tracing::info!(
            "Seeds: {} added, {} already present",
            added,
            seeds.len() as u32 - added
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn seeds() -> Vec<SeedEntry> {
        vec![
            SeedEntry {
                handle: "alice".to_string(),
                profile_url: "https://alice.example.com".to_string(),
            },
            SeedEntry {
                handle: "bob".to_string(),
                profile_url: "https://bob.example.com".to_string(),
            },
        ]
    }

    #[test]
    fn test_seed_parents() {
        let store = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
        let report = seed_parents(&store, &seeds()).unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(store.lock().unwrap().count_parents().unwrap(), 2);
    }

    #[test]
    fn test_seed_parents_rerun_is_idempotent() {
        let store = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
        seed_parents(&store, &seeds()).unwrap();
        let report = seed_parents(&store, &seeds()).unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(store.lock().unwrap().count_parents().unwrap(), 2);
    }
}
