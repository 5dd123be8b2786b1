//! Database schema definitions

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Creators
CREATE TABLE IF NOT EXISTS parents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    handle TEXT NOT NULL UNIQUE,
    profile_url TEXT NOT NULL,
    crawl_state TEXT NOT NULL DEFAULT 'not_started',
    crawl_error TEXT,
    crawl_error_at TEXT,
    first_seen_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Published items; identity is the hashed canonical URL, the slug is
-- display-only and deliberately NOT unique
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity TEXT NOT NULL UNIQUE,
    parent_id INTEGER NOT NULL REFERENCES parents(id),
    slug TEXT,
    title TEXT,
    url TEXT NOT NULL,
    publish_date TEXT,
    rating REAL,
    rating_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    tags TEXT,
    enrich_state TEXT NOT NULL DEFAULT 'unvisited',
    hidden_until TEXT,
    last_enriched_at TEXT,
    first_seen_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_parent ON items(parent_id);
CREATE INDEX IF NOT EXISTS idx_items_state ON items(enrich_state);

-- One score row per parent, recomputed wholesale each scoring pass
CREATE TABLE IF NOT EXISTS scores (
    parent_id INTEGER PRIMARY KEY REFERENCES parents(id),
    item_count INTEGER NOT NULL DEFAULT 0,
    rated_item_count INTEGER NOT NULL DEFAULT 0,
    total_ratings INTEGER NOT NULL DEFAULT 0,
    avg_rating REAL,
    bayesian_score REAL,
    computed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scores_bayesian ON scores(bayesian_score DESC);

-- Stage run ledger
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stage TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0,
    succeeded INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
