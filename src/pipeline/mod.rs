//! Pipeline coordination: stages, run ledger, cancellation
//!
//! Four independently re-runnable stages (discover, backfill, enrich,
//! rescore) plus a composite run that sequences them. Every stage execution
//! is recorded in the run ledger with its report, and a cancellation signal
//! makes workers stop picking up new work while leaving every entity in its
//! last consistent state.

use crate::config::Config;
use crate::crawl::backfill_all;
use crate::discover::discover_all;
use crate::enrich::enrich_all;
use crate::fetch::{FetchClient, PacingGate};
use crate::score::rescore_all;
use crate::state::{CrawlState, EnrichState};
use crate::storage::{RankedParent, RunStatus, SqliteStore, StageReport, Store};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// A pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discover,
    Backfill,
    Enrich,
    Rescore,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Backfill => "backfill",
            Self::Enrich => "enrich",
            Self::Rescore => "rescore",
        }
    }

    /// Stage order for the composite run
    pub fn all() -> [Stage; 4] {
        [Self::Discover, Self::Backfill, Self::Enrich, Self::Rescore]
    }
}

/// Snapshot of store contents for the stats surface
#[derive(Debug)]
pub struct PipelineStats {
    pub parents: u64,
    pub parents_not_started: u64,
    pub parents_in_progress: u64,
    pub parents_complete: u64,
    pub items: u64,
    pub items_unvisited: u64,
    pub items_settled: u64,
    pub items_hidden: u64,
    pub ranking: Vec<RankedParent>,
}

/// Owns the shared dependencies and drives the stages
pub struct Pipeline {
    config: Arc<Config>,
    config_hash: String,
    store: Arc<Mutex<SqliteStore>>,
    fetcher: Arc<FetchClient>,
    cancel_tx: watch::Sender<bool>,
    cancel: watch::Receiver<bool>,
}

impl Pipeline {
    pub fn new(config: Config, config_hash: String) -> crate::Result<Self> {
        let store = SqliteStore::new(Path::new(&config.storage.database_path))?;

        let gate = Arc::new(PacingGate::new(Duration::from_millis(
            config.fetch.min_delay_ms,
        )));
        let fetcher = Arc::new(FetchClient::new(&config.fetch, &config.user_agent, gate)?);

        let (cancel_tx, cancel) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            config_hash,
            store: Arc::new(Mutex::new(store)),
            fetcher,
            cancel_tx,
            cancel,
        })
    }

    /// Signals every worker to stop picking up new work.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Clone of the cancellation sender, for signal handlers.
    pub fn cancel_sender(&self) -> watch::Sender<bool> {
        self.cancel_tx.clone()
    }

    pub fn store(&self) -> &Arc<Mutex<SqliteStore>> {
        &self.store
    }

    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Runs one stage, recording it in the run ledger.
    pub async fn run_stage(&self, stage: Stage) -> crate::Result<StageReport> {
        let run_id = {
            let mut store = self.store.lock().unwrap();
            store.create_run(stage.as_str(), &self.config_hash)?
        };

        tracing::info!("Stage {} starting (run {})", stage.as_str(), run_id);
        let started = std::time::Instant::now();

        let result = match stage {
            Stage::Discover => {
                discover_all(
                    Arc::clone(&self.store),
                    Arc::clone(&self.fetcher),
                    &self.config,
                    self.cancel.clone(),
                )
                .await
            }
            Stage::Backfill => {
                backfill_all(
                    Arc::clone(&self.store),
                    Arc::clone(&self.fetcher),
                    &self.config.crawl,
                    self.cancel.clone(),
                )
                .await
            }
            Stage::Enrich => {
                enrich_all(
                    Arc::clone(&self.store),
                    Arc::clone(&self.fetcher),
                    &self.config.enrich,
                    self.cancel.clone(),
                )
                .await
            }
            Stage::Rescore => rescore_all(&self.store, &self.config.scoring),
        };

        match result {
            Ok(report) => {
                let status = if self.cancelled() {
                    RunStatus::Cancelled
                } else {
                    RunStatus::Completed
                };

                {
                    let mut store = self.store.lock().unwrap();
                    store.finish_run(run_id, status, &report)?;
                }

                tracing::info!(
                    "Stage {} {} in {:?}: {}",
                    stage.as_str(),
                    status.to_db_string(),
                    started.elapsed(),
                    report
                );
                Ok(report)
            }
            Err(e) => {
                let mut store = self.store.lock().unwrap();
                store.finish_run(run_id, RunStatus::Failed, &StageReport::default())?;
                Err(e)
            }
        }
    }

    /// Runs the full pipeline: discover → backfill → enrich → rescore.
    pub async fn run_all(&self) -> crate::Result<Vec<(Stage, StageReport)>> {
        let mut reports = Vec::new();

        for stage in Stage::all() {
            if self.cancelled() {
                tracing::info!("Pipeline cancelled before stage {}", stage.as_str());
                break;
            }
            let report = self.run_stage(stage).await?;
            reports.push((stage, report));
        }

        Ok(reports)
    }

    /// Reads the current store counts and ranking.
    pub fn stats(&self, ranking_limit: u32) -> crate::Result<PipelineStats> {
        let store = self.store.lock().unwrap();

        Ok(PipelineStats {
            parents: store.count_parents()?,
            parents_not_started: store.count_parents_by_state(CrawlState::NotStarted)?,
            parents_in_progress: store.count_parents_by_state(CrawlState::InProgress)?,
            parents_complete: store.count_parents_by_state(CrawlState::Complete)?,
            items: store.count_items()?,
            items_unvisited: store.count_items_by_state(EnrichState::Unvisited)?,
            items_settled: store.count_items_by_state(EnrichState::Settled)?,
            items_hidden: store.count_items_by_state(EnrichState::RatingsHidden)?,
            ranking: store.ranked_parents(ranking_limit)?,
        })
    }
}
