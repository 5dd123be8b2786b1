//! SQLite storage implementation

use crate::state::{CrawlState, EnrichState};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Store, StorageError, StorageResult, UpsertOutcome};
use crate::storage::{
    EnrichmentUpdate, ItemRecord, NewItem, ParentRecord, RankedParent, RatedItem, RunStatus,
    ScoreRecord, StageReport,
};
use crate::url::ItemIdentity;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const ITEM_COLUMNS: &str = "id, identity, parent_id, slug, title, url, publish_date, rating, \
     rating_count, comment_count, description, tags, enrich_state, hidden_until, \
     last_enriched_at, first_seen_at, updated_at";

const PARENT_COLUMNS: &str =
    "id, handle, profile_url, crawl_state, crawl_error, crawl_error_at, first_seen_at, updated_at";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn map_parent_row(row: &Row<'_>) -> rusqlite::Result<ParentRecord> {
        Ok(ParentRecord {
            id: row.get(0)?,
            handle: row.get(1)?,
            profile_url: row.get(2)?,
            crawl_state: CrawlState::from_db_string(&row.get::<_, String>(3)?)
                .unwrap_or(CrawlState::NotStarted),
            crawl_error: row.get(4)?,
            crawl_error_at: parse_dt(row.get(5)?),
            first_seen_at: parse_dt(row.get(6)?).unwrap_or_else(Utc::now),
            updated_at: parse_dt(row.get(7)?).unwrap_or_else(Utc::now),
        })
    }

    fn map_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRecord> {
        let tags_json: Option<String> = row.get(11)?;
        let tags = tags_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or_default();

        Ok(ItemRecord {
            id: row.get(0)?,
            identity: ItemIdentity::from_stored(row.get::<_, String>(1)?),
            parent_id: row.get(2)?,
            slug: row.get(3)?,
            title: row.get(4)?,
            url: row.get(5)?,
            publish_date: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            rating: row.get(7)?,
            rating_count: row.get::<_, i64>(8)? as u32,
            comment_count: row.get::<_, i64>(9)? as u32,
            description: row.get(10)?,
            tags,
            enrich_state: EnrichState::from_db_string(&row.get::<_, String>(12)?)
                .unwrap_or(EnrichState::Unvisited),
            hidden_until: parse_dt(row.get(13)?),
            last_enriched_at: parse_dt(row.get(14)?),
            first_seen_at: parse_dt(row.get(15)?).unwrap_or_else(Utc::now),
            updated_at: parse_dt(row.get(16)?).unwrap_or_else(Utc::now),
        })
    }
}

fn parse_dt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| s.parse::<DateTime<Utc>>().ok())
}

fn tags_to_json(tags: &[String]) -> StorageResult<Option<String>> {
    if tags.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(tags)
        .map(Some)
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

impl Store for SqliteStore {
    // ===== Parents =====

    fn upsert_parent(
        &mut self,
        handle: &str,
        profile_url: &str,
    ) -> StorageResult<(i64, UpsertOutcome)> {
        if let Some(existing) = self.get_parent_by_handle(handle)? {
            return Ok((existing.id, UpsertOutcome::Noop));
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO parents (handle, profile_url, crawl_state, first_seen_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                handle,
                profile_url,
                CrawlState::NotStarted.to_db_string(),
                now
            ],
        )?;

        Ok((self.conn.last_insert_rowid(), UpsertOutcome::Applied))
    }

    fn get_parent(&self, parent_id: i64) -> StorageResult<ParentRecord> {
        let sql = format!("SELECT {} FROM parents WHERE id = ?1", PARENT_COLUMNS);
        self.conn
            .query_row(&sql, params![parent_id], Self::map_parent_row)
            .optional()?
            .ok_or(StorageError::ParentNotFound(parent_id))
    }

    fn get_parent_by_handle(&self, handle: &str) -> StorageResult<Option<ParentRecord>> {
        let sql = format!("SELECT {} FROM parents WHERE handle = ?1", PARENT_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![handle], Self::map_parent_row)
            .optional()?)
    }

    fn parents_needing_backfill(&self) -> StorageResult<Vec<ParentRecord>> {
        let sql = format!(
            "SELECT {} FROM parents WHERE crawl_state != ?1 ORDER BY id",
            PARENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let parents = stmt
            .query_map(
                params![CrawlState::Complete.to_db_string()],
                Self::map_parent_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parents)
    }

    fn set_crawl_state(&mut self, parent_id: i64, state: CrawlState) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE parents SET crawl_state = ?1, updated_at = ?2 WHERE id = ?3",
            params![state.to_db_string(), now, parent_id],
        )?;
        if changed == 0 {
            return Err(StorageError::ParentNotFound(parent_id));
        }
        Ok(())
    }

    fn record_crawl_error(&mut self, parent_id: i64, reason: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE parents SET crawl_error = ?1, crawl_error_at = ?2, updated_at = ?2
             WHERE id = ?3",
            params![reason, now, parent_id],
        )?;
        if changed == 0 {
            return Err(StorageError::ParentNotFound(parent_id));
        }
        Ok(())
    }

    fn count_parents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM parents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_parents_by_state(&self, state: CrawlState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM parents WHERE crawl_state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Items =====

    fn upsert_item(&mut self, parent_id: i64, item: &NewItem) -> StorageResult<UpsertOutcome> {
        let existing = self.get_item_by_identity(&item.identity)?;

        let Some(existing) = existing else {
            let now = Utc::now().to_rfc3339();
            self.conn.execute(
                "INSERT INTO items (identity, parent_id, slug, title, url, publish_date,
                                    enrich_state, first_seen_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    item.identity.as_str(),
                    parent_id,
                    item.slug,
                    item.title,
                    item.url,
                    item.publish_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    EnrichState::Unvisited.to_db_string(),
                    now
                ],
            )?;
            return Ok(UpsertOutcome::Applied);
        };

        // An item belongs to exactly one parent; a colliding identity under
        // a different parent must never silently re-parent the item.
        if existing.parent_id != parent_id {
            return Err(StorageError::IntegrityViolation(format!(
                "identity {} already belongs to parent {} (upsert tried parent {})",
                item.identity, existing.parent_id, parent_id
            )));
        }

        // Merge: only provided fields, and only when they change anything.
        let new_title = item
            .title
            .as_deref()
            .filter(|t| existing.title.as_deref() != Some(*t));
        let new_slug = item
            .slug
            .as_deref()
            .filter(|s| existing.slug.as_deref() != Some(*s));
        let new_date = item.publish_date.filter(|d| existing.publish_date != Some(*d));

        if new_title.is_none() && new_slug.is_none() && new_date.is_none() {
            return Ok(UpsertOutcome::Noop);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE items SET
                 title = COALESCE(?1, title),
                 slug = COALESCE(?2, slug),
                 publish_date = COALESCE(?3, publish_date),
                 updated_at = ?4
             WHERE id = ?5",
            params![
                new_title,
                new_slug,
                new_date.map(|d| d.format("%Y-%m-%d").to_string()),
                now,
                existing.id
            ],
        )?;

        Ok(UpsertOutcome::Applied)
    }

    fn get_item_by_identity(&self, identity: &ItemIdentity) -> StorageResult<Option<ItemRecord>> {
        let sql = format!("SELECT {} FROM items WHERE identity = ?1", ITEM_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![identity.as_str()], Self::map_item_row)
            .optional()?)
    }

    fn items_for_parent(&self, parent_id: i64) -> StorageResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM items WHERE parent_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![parent_id], Self::map_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn due_unvisited(&self, limit: u32) -> StorageResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM items WHERE enrich_state = ?1 ORDER BY id LIMIT ?2",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![EnrichState::Unvisited.to_db_string(), limit],
                Self::map_item_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn due_stale(&self, cutoff: DateTime<Utc>, limit: u32) -> StorageResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM items
             WHERE enrich_state = ?1
               AND (last_enriched_at IS NULL OR last_enriched_at < ?2)
             ORDER BY last_enriched_at LIMIT ?3",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![
                    EnrichState::Settled.to_db_string(),
                    cutoff.to_rfc3339(),
                    limit
                ],
                Self::map_item_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn due_hidden_expired(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> StorageResult<Vec<ItemRecord>> {
        let sql = format!(
            "SELECT {} FROM items
             WHERE enrich_state = ?1
               AND (hidden_until IS NULL OR hidden_until <= ?2)
             ORDER BY hidden_until LIMIT ?3",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(
                params![
                    EnrichState::RatingsHidden.to_db_string(),
                    now.to_rfc3339(),
                    limit
                ],
                Self::map_item_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn apply_enrichment(&mut self, item_id: i64, update: &EnrichmentUpdate) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();

        let changed = match update {
            EnrichmentUpdate::Settled {
                rating,
                rating_count,
                comment_count,
                description,
                tags,
            } => self.conn.execute(
                "UPDATE items SET
                     rating = ?1,
                     rating_count = ?2,
                     comment_count = ?3,
                     description = COALESCE(?4, description),
                     tags = COALESCE(?5, tags),
                     enrich_state = ?6,
                     hidden_until = NULL,
                     last_enriched_at = ?7,
                     updated_at = ?7
                 WHERE id = ?8",
                params![
                    rating,
                    rating_count,
                    comment_count,
                    description,
                    tags_to_json(tags)?,
                    EnrichState::Settled.to_db_string(),
                    now,
                    item_id
                ],
            )?,
            EnrichmentUpdate::Hidden {
                comment_count,
                until,
            } => self.conn.execute(
                // last_enriched_at deliberately untouched: hidden ratings
                // are a cooldown, not a completed enrichment.
                "UPDATE items SET
                     comment_count = ?1,
                     enrich_state = ?2,
                     hidden_until = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    comment_count,
                    EnrichState::RatingsHidden.to_db_string(),
                    until.to_rfc3339(),
                    now,
                    item_id
                ],
            )?,
        };

        if changed == 0 {
            return Err(StorageError::ItemNotFound(item_id));
        }
        Ok(())
    }

    fn count_items(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_items_by_state(&self, state: EnrichState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE enrich_state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Scores =====

    fn all_parent_ids(&self) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM parents ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn rated_items(&self) -> StorageResult<Vec<RatedItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT parent_id, rating, rating_count FROM items WHERE rating IS NOT NULL",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RatedItem {
                    parent_id: row.get(0)?,
                    rating: row.get(1)?,
                    rating_count: row.get::<_, i64>(2)? as u32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert_score(&mut self, score: &ScoreRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scores (parent_id, item_count, rated_item_count, total_ratings,
                                 avg_rating, bayesian_score, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(parent_id) DO UPDATE SET
                 item_count = excluded.item_count,
                 rated_item_count = excluded.rated_item_count,
                 total_ratings = excluded.total_ratings,
                 avg_rating = excluded.avg_rating,
                 bayesian_score = excluded.bayesian_score,
                 computed_at = excluded.computed_at",
            params![
                score.parent_id,
                score.item_count,
                score.rated_item_count,
                score.total_ratings as i64,
                score.avg_rating,
                score.bayesian_score,
                now
            ],
        )?;
        Ok(())
    }

    fn ranked_parents(&self, limit: u32) -> StorageResult<Vec<RankedParent>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.handle, s.parent_id, s.item_count, s.rated_item_count, s.total_ratings,
                    s.avg_rating, s.bayesian_score
             FROM scores s
             JOIN parents p ON p.id = s.parent_id
             WHERE s.bayesian_score IS NOT NULL
             ORDER BY s.bayesian_score DESC, p.handle
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(RankedParent {
                    handle: row.get(0)?,
                    score: ScoreRecord {
                        parent_id: row.get(1)?,
                        item_count: row.get::<_, i64>(2)? as u32,
                        rated_item_count: row.get::<_, i64>(3)? as u32,
                        total_ratings: row.get::<_, i64>(4)? as u64,
                        avg_rating: row.get(5)?,
                        bayesian_score: row.get(6)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ===== Run ledger =====

    fn create_run(&mut self, stage: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (stage, started_at, status, config_hash) VALUES (?1, ?2, ?3, ?4)",
            params![stage, now, RunStatus::Running.to_db_string(), config_hash],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &StageReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, processed = ?3, succeeded = ?4,
                             failed = ?5
             WHERE id = ?6",
            params![
                now,
                status.to_db_string(),
                report.processed as i64,
                report.succeeded as i64,
                report.failed as i64,
                run_id
            ],
        )?;
        Ok(())
    }
}
