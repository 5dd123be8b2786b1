//! Atelier-Rank: a polite creator-ranking pipeline
//!
//! This crate discovers creators on an indie game storefront, backfills their
//! full publication history, enriches each game with volatile rating metadata,
//! and produces a Bayesian ranking of creators.

pub mod config;
pub mod crawl;
pub mod discover;
pub mod enrich;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod score;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Atelier-Rank operations
#[derive(Debug, Error)]
pub enum AtelierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Failed to resolve '{href}' against {base}")]
    Resolve { base: String, href: String },
}

/// Result type alias for Atelier-Rank operations
pub type Result<T> = std::result::Result<T, AtelierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use crate::config::Config;
pub use crate::state::{CrawlState, EnrichState};
pub use crate::url::{normalize_url, resolve_identity, resolve_url, ItemIdentity};
