//! Enrichment pass: fetch due item pages and apply rating transitions
//!
//! A fetch or parse failure leaves the item's state and timestamps exactly
//! as they were, and the item stays immediately eligible on the next run. Only
//! a positive "ratings hidden" signal starts the cooldown.

use crate::config::EnrichConfig;
use crate::enrich::scheduler::select_due;
use crate::fetch::FetchClient;
use crate::parse::{parse_detail, RatingSignal};
use crate::storage::{EnrichmentUpdate, ItemRecord, SqliteStore, StageReport, Store};
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use url::Url;

/// What one enrichment attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Rating captured; item settled
    Settled,
    /// Page confirmed ratings hidden; cooldown started
    Hidden,
    /// Fetch or parse failure; item state unchanged
    Failed,
}

/// Enriches a single item.
pub async fn enrich_item(
    store: &Arc<Mutex<SqliteStore>>,
    fetcher: &FetchClient,
    item: &ItemRecord,
    cooldown: Duration,
) -> crate::Result<EnrichOutcome> {
    let url = match Url::parse(&item.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Unfetchable item URL {} ({}): {}", item.url, item.identity, e);
            return Ok(EnrichOutcome::Failed);
        }
    };

    let response = match fetcher.fetch(&url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                "Enrichment fetch failed for {} ({:?}): {}",
                item.url,
                e.kind(),
                e
            );
            return Ok(EnrichOutcome::Failed);
        }
    };

    let detail = parse_detail(&response.body);

    match detail.ratings {
        RatingSignal::Rated { rating, count } => {
            let mut store = store.lock().unwrap();
            store.apply_enrichment(
                item.id,
                &EnrichmentUpdate::Settled {
                    rating,
                    rating_count: count,
                    comment_count: detail.comment_count,
                    description: detail.description,
                    tags: detail.tags,
                },
            )?;
            Ok(EnrichOutcome::Settled)
        }
        RatingSignal::Hidden => {
            let mut store = store.lock().unwrap();
            store.apply_enrichment(
                item.id,
                &EnrichmentUpdate::Hidden {
                    comment_count: detail.comment_count,
                    until: Utc::now() + cooldown,
                },
            )?;
            Ok(EnrichOutcome::Hidden)
        }
        RatingSignal::Unknown => {
            tracing::warn!("Unparseable detail page for {} ({})", item.url, item.identity);
            Ok(EnrichOutcome::Failed)
        }
    }
}

/// Enriches every due item, up to the per-class budget.
pub async fn enrich_all(
    store: Arc<Mutex<SqliteStore>>,
    fetcher: Arc<FetchClient>,
    config: &EnrichConfig,
    cancel: watch::Receiver<bool>,
) -> crate::Result<StageReport> {
    let due = {
        let store = store.lock().unwrap();
        select_due(&*store, config, Utc::now())?
    };

    tracing::info!("Enriching {} due items", due.len());

    let cooldown = Duration::days(config.hidden_cooldown_days);
    let stale_after = Duration::days(config.stale_after_days);
    let semaphore = Arc::new(Semaphore::new(config.workers as usize));
    let mut join_set = JoinSet::new();

    for item in due {
        if *cancel.borrow() {
            break;
        }

        // Another writer may have touched the item since selection.
        let still_due = item
            .enrich_state
            .due_class(Utc::now(), item.last_enriched_at, item.hidden_until, stale_after)
            .is_some();
        if !still_due {
            continue;
        }

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let store = Arc::clone(&store);
        let fetcher = Arc::clone(&fetcher);

        join_set.spawn(async move {
            let _permit = permit;
            let result = enrich_item(&store, &fetcher, &item, cooldown).await;
            (item.url, result)
        });
    }

    let mut report = StageReport::default();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((_, Ok(EnrichOutcome::Settled))) | Ok((_, Ok(EnrichOutcome::Hidden))) => {
                report.success();
            }
            Ok((_, Ok(EnrichOutcome::Failed))) => report.failure(),
            Ok((url, Err(e))) => {
                tracing::error!("Enrichment failed for {}: {}", url, e);
                report.failure();
            }
            Err(e) => {
                tracing::error!("Enrichment worker panicked: {}", e);
                report.failure();
            }
        }
    }

    Ok(report)
}
