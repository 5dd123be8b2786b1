//! Release feed parser (RSS/Atom)
//!
//! Thin wrapper over feed-rs reducing feed entries to the discovery tuple
//! shape. Entries without a link are skipped; a feed that does not parse at
//! all is a failure the discovery stage records.

use chrono::{DateTime, Utc};
use feed_rs::parser;

/// One release found in a feed
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub url: String,
    pub publish_date: Option<DateTime<Utc>>,
}

/// Parses a feed document into release entries.
pub fn parse_feed(body: &[u8]) -> Result<Vec<FeedEntry>, parser::ParseFeedError> {
    let feed = parser::parse(body)?;

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let url = entry.links.first().map(|l| l.href.clone())?;
            Some(FeedEntry {
                title: entry.title.map(|t| t.content),
                url,
                publish_date: entry.published,
            })
        })
        .collect();

    Ok(entries)
}
