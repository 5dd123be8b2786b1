/// Enrichment state for an item (game)
///
/// The stored state is one of `unvisited`, `settled`, `ratings_hidden`.
/// Staleness is never stored: a settled item becomes stale purely by the age
/// of its `last_enriched_at` timestamp, so "stale" shows up here only as a
/// due-class when selecting work.
use chrono::{DateTime, Duration, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichState {
    /// Never successfully enriched
    Unvisited,

    /// A fetch yielded a rating value; re-enriched once stale
    Settled,

    /// The page positively reported ratings as hidden/not-yet-visible;
    /// revisited only after the cooldown elapses
    RatingsHidden,
}

/// Why an item is due for enrichment, in selection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DueClass {
    Unvisited,
    Stale,
    HiddenExpired,
}

impl EnrichState {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Settled => "settled",
            Self::RatingsHidden => "ratings_hidden",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "unvisited" => Some(Self::Unvisited),
            "settled" => Some(Self::Settled),
            "ratings_hidden" => Some(Self::RatingsHidden),
            _ => None,
        }
    }

    /// Classifies whether an item in this state is due for (re-)enrichment.
    ///
    /// Returns `None` when the item is settled-and-fresh or still inside its
    /// hidden-ratings cooldown.
    pub fn due_class(
        &self,
        now: DateTime<Utc>,
        last_enriched_at: Option<DateTime<Utc>>,
        hidden_until: Option<DateTime<Utc>>,
        stale_after: Duration,
    ) -> Option<DueClass> {
        match self {
            Self::Unvisited => Some(DueClass::Unvisited),
            Self::Settled => match last_enriched_at {
                // A settled item without a timestamp never had a recorded
                // enrichment; treat it as stale rather than freezing it.
                None => Some(DueClass::Stale),
                Some(at) if now - at > stale_after => Some(DueClass::Stale),
                Some(_) => None,
            },
            Self::RatingsHidden => match hidden_until {
                None => Some(DueClass::HiddenExpired),
                Some(until) if now >= until => Some(DueClass::HiddenExpired),
                Some(_) => None,
            },
        }
    }
}

impl fmt::Display for EnrichState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
