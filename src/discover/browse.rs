//! Browse-page discovery
//!
//! Walks the storefront's curated listing pages (top rated, newest, genre
//! pages, ...) with the same pagination cursor as backfill, under a much
//! smaller page cap. Discovered items are ingested but parents' crawl state
//! is left alone: backfill owns those transitions.

use crate::crawl::{CrawlCursor, CursorState};
use crate::discover::ingest_candidate;
use crate::fetch::FetchClient;
use crate::parse::parse_listing;
use crate::storage::{SqliteStore, StageReport};
use crate::url::normalize_url;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Walks each configured browse source and ingests every listed item.
pub async fn scrape_browse_pages(
    store: &Arc<Mutex<SqliteStore>>,
    fetcher: &FetchClient,
    pages: &[String],
    page_cap: u32,
    cancel: &watch::Receiver<bool>,
) -> crate::Result<StageReport> {
    let mut report = StageReport::default();

    for source in pages {
        if *cancel.borrow() {
            break;
        }

        let seed = match normalize_url(source) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Bad browse page URL {}: {}", source, e);
                report.failure();
                continue;
            }
        };

        let mut cursor = CrawlCursor::new(seed, page_cap);

        while let Some(page_url) = cursor.next_target() {
            if *cancel.borrow() {
                break;
            }

            match fetcher.fetch(&page_url).await {
                Ok(response) => {
                    let listing = parse_listing(&response.body, &response.final_url);
                    let item_count = listing.items.len() as u32;

                    {
                        let mut store = store.lock().unwrap();
                        for listed in &listing.items {
                            let ingested = ingest_candidate(
                                &mut store,
                                &listed.url,
                                listed.title.as_deref(),
                                listed.publish_date,
                            )?;
                            if ingested.is_some() {
                                report.success();
                            }
                        }
                    }

                    cursor.on_parsed(item_count, listing.next_page);
                }
                Err(e) => {
                    tracing::warn!("Browse fetch failed for {}: {}", page_url, e);
                    cursor.on_failed(e.to_string());
                    report.failure();
                }
            }
        }

        if let CursorState::Aborted(reason) = cursor.state() {
            tracing::debug!(
                "Browse walk of {} ended early after {} pages: {}",
                source,
                cursor.pages_parsed(),
                reason.describe()
            );
        }
    }

    Ok(report)
}
