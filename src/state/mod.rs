//! State machines for crawl and enrichment progress
//!
//! Every transition in the pipeline is a named edge on one of these enums;
//! there are no implicit "done" flags driven by side effects.

mod crawl_state;
mod enrich_state;

pub use crawl_state::CrawlState;
pub use enrich_state::{DueClass, EnrichState};
