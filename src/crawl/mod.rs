//! Per-parent history crawl: pagination cursor and backfill driver

mod backfill;
mod cursor;

pub use backfill::{backfill_all, backfill_parent, WalkSummary};
pub use cursor::{AbortReason, CrawlCursor, CursorState};
