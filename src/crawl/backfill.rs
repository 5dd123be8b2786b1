//! Backfill: walk each parent's full publication history
//!
//! One cursor per parent, pages strictly sequential within a walk, parents
//! processed concurrently by a bounded worker pool. Per-page and per-item
//! failures are recorded against the parent and never abort the whole stage.

use crate::config::CrawlConfig;
use crate::crawl::cursor::{CrawlCursor, CursorState};
use crate::fetch::FetchClient;
use crate::parse::parse_listing;
use crate::state::CrawlState;
use crate::storage::{NewItem, SqliteStore, StageReport, StorageError, Store};
use crate::url::{normalize_url, ItemIdentity};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use url::Url;

/// Result of walking one parent's listing
#[derive(Debug, Clone, Copy)]
pub struct WalkSummary {
    pub pages_parsed: u32,
    pub items_upserted: u32,
    /// Whether the parent was marked `complete`
    pub completed: bool,
}

/// Walks one parent's paginated listing and upserts every discovered item.
///
/// Fetch and parse failures end the walk and are recorded against the
/// parent; only storage-level failures propagate as errors.
pub async fn backfill_parent(
    store: &Arc<Mutex<SqliteStore>>,
    fetcher: &FetchClient,
    parent_id: i64,
    handle: &str,
    profile_url: &str,
    page_cap: u32,
    cancel: &watch::Receiver<bool>,
) -> crate::Result<WalkSummary> {
    let seed = match normalize_url(profile_url) {
        Ok(url) => url,
        Err(e) => {
            let reason = format!("invalid profile URL: {}", e);
            tracing::warn!("Skipping {}: {}", handle, reason);
            let mut store = store.lock().unwrap();
            store.record_crawl_error(parent_id, &reason)?;
            return Ok(WalkSummary {
                pages_parsed: 0,
                items_upserted: 0,
                completed: false,
            });
        }
    };

    {
        let mut store = store.lock().unwrap();
        store.set_crawl_state(parent_id, CrawlState::InProgress)?;
    }

    let mut cursor = CrawlCursor::new(seed, page_cap);
    let mut items_upserted = 0u32;

    while let Some(page_url) = cursor.next_target() {
        if *cancel.borrow() {
            tracing::info!("Cancelled mid-walk for {}", handle);
            break;
        }

        match fetcher.fetch(&page_url).await {
            Ok(response) => {
                // Links on the page resolve against where the page actually
                // came from, not where we asked for it.
                let listing = parse_listing(&response.body, &response.final_url);
                let item_count = listing.items.len() as u32;

                {
                    let mut store = store.lock().unwrap();
                    for listed in &listing.items {
                        let new_item = NewItem {
                            identity: ItemIdentity::of(&listed.url),
                            url: listed.url.to_string(),
                            slug: item_slug(&listed.url),
                            title: listed.title.clone(),
                            publish_date: listed.publish_date,
                        };

                        match store.upsert_item(parent_id, &new_item) {
                            Ok(_) => items_upserted += 1,
                            Err(StorageError::IntegrityViolation(msg)) => {
                                // One bad record never sinks the walk.
                                tracing::warn!("Skipping item on {}: {}", handle, msg);
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                }

                cursor.on_parsed(item_count, listing.next_page);
            }
            Err(e) => {
                tracing::warn!("Page fetch failed for {} at {}: {}", handle, page_url, e);
                cursor.on_failed(e.to_string());
            }
        }
    }

    let completed = finish_walk(store, parent_id, &cursor)?;

    Ok(WalkSummary {
        pages_parsed: cursor.pages_parsed(),
        items_upserted,
        completed,
    })
}

/// Applies the completion policy for a finished (or interrupted) walk.
///
/// `complete` requires a full error-free walk; a walk that fetched nothing
/// rolls the parent back to `not_started` so a later run retries it, and an
/// aborted or cancelled walk never marks the parent `complete`.
fn finish_walk(
    store: &Arc<Mutex<SqliteStore>>,
    parent_id: i64,
    cursor: &CrawlCursor,
) -> crate::Result<bool> {
    let mut store = store.lock().unwrap();

    match cursor.state() {
        CursorState::Done => {
            store.set_crawl_state(parent_id, CrawlState::Complete)?;
            Ok(true)
        }
        CursorState::Aborted(reason) => {
            store.record_crawl_error(parent_id, &reason.describe())?;
            if cursor.pages_parsed() == 0 {
                store.set_crawl_state(parent_id, CrawlState::NotStarted)?;
            }
            Ok(false)
        }
        // Cancelled before the walk ended
        CursorState::Start | CursorState::Fetching(_) => {
            if cursor.pages_parsed() == 0 {
                store.set_crawl_state(parent_id, CrawlState::NotStarted)?;
            }
            Ok(false)
        }
    }
}

/// Backfills every parent whose history is not yet complete.
pub async fn backfill_all(
    store: Arc<Mutex<SqliteStore>>,
    fetcher: Arc<FetchClient>,
    config: &CrawlConfig,
    cancel: watch::Receiver<bool>,
) -> crate::Result<StageReport> {
    let parents = {
        let store = store.lock().unwrap();
        store.parents_needing_backfill()?
    };

    tracing::info!("Backfilling {} parents", parents.len());

    let semaphore = Arc::new(Semaphore::new(config.workers as usize));
    let mut join_set = JoinSet::new();

    for parent in parents {
        if *cancel.borrow() {
            break;
        }

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let store = Arc::clone(&store);
        let fetcher = Arc::clone(&fetcher);
        let cancel = cancel.clone();
        let page_cap = config.page_cap;

        join_set.spawn(async move {
            let _permit = permit;
            let result = backfill_parent(
                &store,
                &fetcher,
                parent.id,
                &parent.handle,
                &parent.profile_url,
                page_cap,
                &cancel,
            )
            .await;
            (parent.handle, result)
        });
    }

    let mut report = StageReport::default();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((handle, Ok(summary))) => {
                if summary.completed {
                    tracing::info!(
                        "Backfilled {}: {} items across {} pages",
                        handle,
                        summary.items_upserted,
                        summary.pages_parsed
                    );
                    report.success();
                } else {
                    report.failure();
                }
            }
            Ok((handle, Err(e))) => {
                tracing::error!("Backfill failed for {}: {}", handle, e);
                report.failure();
            }
            Err(e) => {
                tracing::error!("Backfill worker panicked: {}", e);
                report.failure();
            }
        }
    }

    Ok(report)
}

/// Last path segment of an item URL, kept as a display attribute only.
fn item_slug(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_slug() {
        let url = Url::parse("https://testdev.example.com/cool-game").unwrap();
        assert_eq!(item_slug(&url), Some("cool-game".to_string()));
    }

    #[test]
    fn test_item_slug_root_is_none() {
        let url = Url::parse("https://testdev.example.com/").unwrap();
        assert_eq!(item_slug(&url), None);
    }
}
