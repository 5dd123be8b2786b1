//! Creator scoring: count-weighted averages under a Bayesian prior
//!
//! ```text
//! avg_rating     = Σ(rating_i × count_i) / Σ(count_i)
//! bayesian_score = (total/(total+m))·avg + (m/(total+m))·global_avg
//! ```
//!
//! The average is count-weighted: a single five-star rating must not outrank
//! a hundred four-star ones. Parents with no rated items get a null score
//! and stay out of the ranking entirely, never a default zero.

use crate::config::ScoringConfig;
use crate::storage::{ScoreRecord, SqliteStore, StageReport, Store};
use std::sync::{Arc, Mutex};

/// Count-weighted average over `(rating, count)` evidence.
///
/// Returns `None` for no evidence. When every count is zero (a degenerate
/// page state) the unweighted mean of the ratings is used instead.
pub fn weighted_average(ratings: &[(f64, u32)]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }

    let total: u64 = ratings.iter().map(|(_, c)| *c as u64).sum();
    if total == 0 {
        let sum: f64 = ratings.iter().map(|(r, _)| r).sum();
        return Some(sum / ratings.len() as f64);
    }

    let weighted: f64 = ratings.iter().map(|(r, c)| r * *c as f64).sum();
    Some(weighted / total as f64)
}

/// Bayesian average pulling low-evidence parents toward the global mean.
pub fn bayesian_score(avg_rating: f64, total_ratings: u64, min_votes: u32, global_avg: f64) -> f64 {
    let total = total_ratings as f64;
    let m = min_votes as f64;
    (total / (total + m)) * avg_rating + (m / (total + m)) * global_avg
}

/// Recomputes every parent's score from its current items.
///
/// The global average is computed once per pass over all rated items
/// system-wide; with no rated items anywhere it falls back to the
/// configured prior mean.
pub fn rescore_all(
    store: &Arc<Mutex<SqliteStore>>,
    config: &ScoringConfig,
) -> crate::Result<StageReport> {
    let mut store = store.lock().unwrap();

    let all_rated = store.rated_items()?;
    let global_evidence: Vec<(f64, u32)> = all_rated
        .iter()
        .map(|item| (item.rating, item.rating_count))
        .collect();
    let global_avg = weighted_average(&global_evidence).unwrap_or(config.prior_mean);

    tracing::debug!(
        "Scoring pass: {} rated items, global average {:.4}",
        all_rated.len(),
        global_avg
    );

    let mut report = StageReport::default();

    for parent_id in store.all_parent_ids()? {
        let items = store.items_for_parent(parent_id)?;

        let evidence: Vec<(f64, u32)> = items
            .iter()
            .filter_map(|item| item.rating.map(|r| (r, item.rating_count)))
            .collect();

        let total_ratings: u64 = evidence.iter().map(|(_, c)| *c as u64).sum();

        let (avg_rating, score) = match weighted_average(&evidence) {
            Some(avg) => {
                let score = bayesian_score(avg, total_ratings, config.min_votes_prior, global_avg);
                (Some(round_to(avg, 2)), Some(round_to(score, 4)))
            }
            None => (None, None),
        };

        store.upsert_score(&ScoreRecord {
            parent_id,
            item_count: items.len() as u32,
            rated_item_count: evidence.len() as u32,
            total_ratings,
            avg_rating,
            bayesian_score: score,
        })?;
        report.success();
    }

    Ok(report)
}

fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
