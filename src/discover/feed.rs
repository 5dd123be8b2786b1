//! Release-feed polling

use crate::discover::ingest_candidate;
use crate::fetch::FetchClient;
use crate::parse::parse_feed;
use crate::storage::{SqliteStore, StageReport};
use crate::url::normalize_url;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Polls each configured feed and ingests its entries.
///
/// Entries are deduplicated by canonical URL across feeds within one poll;
/// a feed that fails to fetch or parse counts one failure and the poll
/// moves on.
pub async fn poll_feeds(
    store: &Arc<Mutex<SqliteStore>>,
    fetcher: &FetchClient,
    feeds: &[String],
    cancel: &watch::Receiver<bool>,
) -> crate::Result<StageReport> {
    let mut report = StageReport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for feed_url in feeds {
        if *cancel.borrow() {
            break;
        }

        let url = match url::Url::parse(feed_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Bad feed URL {}: {}", feed_url, e);
                report.failure();
                continue;
            }
        };

        let response = match fetcher.fetch(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Feed fetch failed for {}: {}", feed_url, e);
                report.failure();
                continue;
            }
        };

        let entries = match parse_feed(response.body.as_bytes()) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Feed parse failed for {}: {}", feed_url, e);
                report.failure();
                continue;
            }
        };

        tracing::info!("Feed {} yielded {} entries", feed_url, entries.len());

        let mut store = store.lock().unwrap();
        for entry in entries {
            let Ok(canonical) = normalize_url(&entry.url) else {
                tracing::warn!("Skipping feed entry with bad URL: {}", entry.url);
                continue;
            };

            if !seen.insert(canonical.to_string()) {
                continue;
            }

            let ingested = ingest_candidate(
                &mut store,
                &canonical,
                entry.title.as_deref(),
                entry.publish_date.map(|d| d.date_naive()),
            )?;

            if ingested.is_some() {
                report.success();
            }
        }
    }

    Ok(report)
}
