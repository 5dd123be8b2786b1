//! Persistent storage: records, the `Store` trait, and the SQLite backend

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStore;
pub use traits::{Store, StorageError, StorageResult, UpsertOutcome};

use crate::state::{CrawlState, EnrichState};
use crate::url::ItemIdentity;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

/// A stored parent (creator)
#[derive(Debug, Clone)]
pub struct ParentRecord {
    pub id: i64,
    pub handle: String,
    pub profile_url: String,
    pub crawl_state: CrawlState,
    pub crawl_error: Option<String>,
    pub crawl_error_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored item (game)
#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub id: i64,
    pub identity: ItemIdentity,
    pub parent_id: i64,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub url: String,
    pub publish_date: Option<NaiveDate>,
    pub rating: Option<f64>,
    pub rating_count: u32,
    pub comment_count: u32,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub enrich_state: EnrichState,
    pub hidden_until: Option<DateTime<Utc>>,
    pub last_enriched_at: Option<DateTime<Utc>>,
    pub first_seen_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discovery-time item fields; everything but the URL and identity may still
/// be unknown
#[derive(Debug, Clone)]
pub struct NewItem {
    pub identity: ItemIdentity,
    pub url: String,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub publish_date: Option<NaiveDate>,
}

/// A named enrichment transition to apply to an item
#[derive(Debug, Clone)]
pub enum EnrichmentUpdate {
    /// The page yielded a rating: item settles
    Settled {
        rating: f64,
        rating_count: u32,
        comment_count: u32,
        description: Option<String>,
        tags: Vec<String>,
    },
    /// The page positively reported hidden ratings: cooldown until `until`
    Hidden {
        comment_count: u32,
        until: DateTime<Utc>,
    },
}

/// A stored score row, one per parent
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub parent_id: i64,
    pub item_count: u32,
    pub rated_item_count: u32,
    pub total_ratings: u64,
    /// Count-weighted average; None when the parent has no rated items
    pub avg_rating: Option<f64>,
    /// None when the parent has no rated items; such parents are excluded
    /// from ranked output
    pub bayesian_score: Option<f64>,
}

/// Rating evidence for one item, as consumed by the scorer
#[derive(Debug, Clone, Copy)]
pub struct RatedItem {
    pub parent_id: i64,
    pub rating: f64,
    pub rating_count: u32,
}

/// A ranked entry for display
#[derive(Debug, Clone)]
pub struct RankedParent {
    pub handle: String,
    pub score: ScoreRecord,
}

/// Outcome of one pipeline stage run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl StageReport {
    pub fn success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    pub fn merge(&mut self, other: &StageReport) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed: {}, succeeded: {}, failed: {}",
            self.processed, self.succeeded, self.failed
        )
    }
}

/// Status of a recorded stage run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}
