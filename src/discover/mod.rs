//! Discovery: feed polling, browse-page scraping, and seed creators
//!
//! Every source reduces to `(title?, item_url, publish_date?)` candidates;
//! each candidate runs through the identity resolver and the upsert layer.
//! Creators are derived from the item URL's subdomain; candidates whose
//! handle cannot be derived are skipped with a warning, never collapsed
//! into a junk parent.

mod browse;
mod feed;
mod seeds;

pub use browse::scrape_browse_pages;
pub use feed::poll_feeds;
pub use seeds::seed_parents;

use crate::config::{Config, DiscoveryConfig};
use crate::fetch::FetchClient;
use crate::storage::{NewItem, SqliteStore, StageReport, StorageError, Store, UpsertOutcome};
use crate::url::{extract_handle, profile_url_for, ItemIdentity};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use url::Url;

/// Runs every configured discovery source: seeds, feeds, then browse pages.
pub async fn discover_all(
    store: Arc<Mutex<SqliteStore>>,
    fetcher: Arc<FetchClient>,
    config: &Config,
    cancel: watch::Receiver<bool>,
) -> crate::Result<StageReport> {
    let mut report = seed_parents(&store, &config.seeds)?;

    let DiscoveryConfig {
        feeds,
        browse_pages,
        browse_page_cap,
    } = &config.discovery;

    let feed_report = poll_feeds(&store, &fetcher, feeds, &cancel).await?;
    report.merge(&feed_report);

    let browse_report =
        scrape_browse_pages(&store, &fetcher, browse_pages, *browse_page_cap, &cancel).await?;
    report.merge(&browse_report);

    Ok(report)
}

/// Upserts one discovered candidate: its parent (by subdomain handle) and
/// the item itself.
///
/// Returns `None` when the candidate was skipped (underivable handle or an
/// identity integrity violation); storage-level failures propagate.
pub(crate) fn ingest_candidate(
    store: &mut SqliteStore,
    url: &Url,
    title: Option<&str>,
    publish_date: Option<NaiveDate>,
) -> crate::Result<Option<UpsertOutcome>> {
    let Some(handle) = extract_handle(url) else {
        tracing::warn!("Could not derive creator handle from URL: {}", url);
        return Ok(None);
    };

    let Some(profile_url) = profile_url_for(url) else {
        tracing::warn!("Could not derive profile URL from: {}", url);
        return Ok(None);
    };

    let item = NewItem {
        identity: ItemIdentity::of(url),
        url: url.to_string(),
        slug: url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .map(|s| s.to_string()),
        title: title.map(|t| t.to_string()),
        publish_date,
    };

    let mut outcome = None;
    {
        let (parent_id, _) = store.upsert_parent(&handle, profile_url.as_str())?;
        match store.upsert_item(parent_id, &item) {
            Ok(applied) => outcome = Some(applied),
            Err(StorageError::IntegrityViolation(msg)) => {
                tracing::warn!("Skipping discovered item: {}", msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(outcome)
}
