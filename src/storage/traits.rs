//! Storage trait and error types

use crate::state::{CrawlState, EnrichState};
use crate::storage::{
    EnrichmentUpdate, ItemRecord, NewItem, ParentRecord, RankedParent, RatedItem, RunStatus,
    ScoreRecord, StageReport,
};
use crate::url::ItemIdentity;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Parent not found: {0}")]
    ParentNotFound(i64),

    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Whether an upsert changed anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A row was created or at least one column changed
    Applied,
    /// The write was a replay: nothing changed
    Noop,
}

/// Trait for storage backend implementations
///
/// All writes are idempotent: replaying an upsert with identical values is a
/// no-op, and partial field sets never null out previously known columns.
pub trait Store {
    // ===== Parents =====

    /// Inserts a parent or returns the existing one by handle.
    fn upsert_parent(&mut self, handle: &str, profile_url: &str)
        -> StorageResult<(i64, UpsertOutcome)>;

    fn get_parent(&self, parent_id: i64) -> StorageResult<ParentRecord>;

    fn get_parent_by_handle(&self, handle: &str) -> StorageResult<Option<ParentRecord>>;

    /// Parents whose history is not yet completely walked
    /// (`not_started` or `in_progress`).
    fn parents_needing_backfill(&self) -> StorageResult<Vec<ParentRecord>>;

    fn set_crawl_state(&mut self, parent_id: i64, state: CrawlState) -> StorageResult<()>;

    /// Records a crawl failure reason and timestamp against the parent.
    fn record_crawl_error(&mut self, parent_id: i64, reason: &str) -> StorageResult<()>;

    fn count_parents(&self) -> StorageResult<u64>;

    fn count_parents_by_state(&self, state: CrawlState) -> StorageResult<u64>;

    // ===== Items =====

    /// Inserts an item or merges the provided fields into the existing row.
    ///
    /// Fails with `IntegrityViolation` if the identity already belongs to a
    /// different parent.
    fn upsert_item(&mut self, parent_id: i64, item: &NewItem) -> StorageResult<UpsertOutcome>;

    fn get_item_by_identity(&self, identity: &ItemIdentity) -> StorageResult<Option<ItemRecord>>;

    fn items_for_parent(&self, parent_id: i64) -> StorageResult<Vec<ItemRecord>>;

    /// Items never successfully enriched.
    fn due_unvisited(&self, limit: u32) -> StorageResult<Vec<ItemRecord>>;

    /// Settled items last enriched before `cutoff`.
    fn due_stale(&self, cutoff: DateTime<Utc>, limit: u32) -> StorageResult<Vec<ItemRecord>>;

    /// Hidden-ratings items whose cooldown elapsed at `now`.
    fn due_hidden_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StorageResult<Vec<ItemRecord>>;

    /// Applies a named enrichment transition; updates only the columns the
    /// transition provides.
    fn apply_enrichment(&mut self, item_id: i64, update: &EnrichmentUpdate) -> StorageResult<()>;

    fn count_items(&self) -> StorageResult<u64>;

    fn count_items_by_state(&self, state: EnrichState) -> StorageResult<u64>;

    // ===== Scores =====

    fn all_parent_ids(&self) -> StorageResult<Vec<i64>>;

    /// Rating evidence across all items with a rating present.
    fn rated_items(&self) -> StorageResult<Vec<RatedItem>>;

    fn upsert_score(&mut self, score: &ScoreRecord) -> StorageResult<()>;

    /// Ranked parents, best first; parents without a Bayesian score are
    /// excluded.
    fn ranked_parents(&self, limit: u32) -> StorageResult<Vec<RankedParent>>;

    // ===== Run ledger =====

    fn create_run(&mut self, stage: &str, config_hash: &str) -> StorageResult<i64>;

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &StageReport,
    ) -> StorageResult<()>;
}
