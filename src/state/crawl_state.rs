/// Crawl state for a parent (creator)
///
/// Tracks how far the backfill walk of a creator's publication history has
/// progressed. Only the backfill walk mutates this state.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Creator discovered; history never walked (or last walk fetched
    /// nothing and was rolled back)
    NotStarted,

    /// A walk started and fetched at least one page, then stopped early;
    /// eligible for retry
    InProgress,

    /// Full history walked successfully
    Complete,
}

impl CrawlState {
    /// Returns true if a backfill run should pick this parent up
    pub fn needs_backfill(&self) -> bool {
        !matches!(self, Self::Complete)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
