//! Page parsers: pure functions from fetched bytes to structured records
//!
//! These are the pipeline's external collaborators. They never touch the
//! network or the store, and the pipeline treats empty output as "no data
//! yet" rather than a failure.

mod detail;
mod feed;
mod listing;

pub use detail::{parse_detail, Detail, RatingSignal};
pub use feed::{parse_feed, FeedEntry};
pub use listing::{parse_listing, ListedItem, Listing};
