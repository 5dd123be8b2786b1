//! Due-item selection for enrichment
//!
//! Priority order: `Unvisited > Stale > RatingsHidden(expired)`, each class
//! capped by the configured budget. The order is a scheduling hint to spend
//! the budget where it buys the most new information, not a correctness
//! requirement.

use crate::config::EnrichConfig;
use crate::storage::{ItemRecord, StorageResult, Store};
use chrono::{DateTime, Duration, Utc};

/// Selects the items due for enrichment at `now`.
pub fn select_due<S: Store>(
    store: &S,
    config: &EnrichConfig,
    now: DateTime<Utc>,
) -> StorageResult<Vec<ItemRecord>> {
    let budget = config.budget;
    let stale_cutoff = now - Duration::days(config.stale_after_days);

    let mut due = store.due_unvisited(budget)?;
    due.extend(store.due_stale(stale_cutoff, budget)?);
    due.extend(store.due_hidden_expired(now, budget)?);

    Ok(due)
}
