use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use atelier_rank::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Page cap: {}", config.crawl.page_cap);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded with each run so operators can tell which configuration
/// produced a given stage report.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const MINIMAL_CONFIG: &str = r#"
[user-agent]
crawler-name = "atelier-rank"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./atelier.db"
"#;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = create_temp_config(MINIMAL_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetch.min_delay_ms, 2000);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.crawl.page_cap, 50);
        assert_eq!(config.enrich.hidden_cooldown_days, 7);
        assert_eq!(config.enrich.stale_after_days, 7);
        assert_eq!(config.scoring.min_votes_prior, 10);
        assert!(config.seeds.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let config_content = r#"
[fetch]
min-delay-ms = 500
max-retries = 2

[crawl]
page-cap = 10
workers = 2

[enrich]
budget = 25
hidden-cooldown-days = 3
stale-after-days = 14

[scoring]
min-votes-prior = 5
prior-mean = 3.0

[discovery]
feeds = ["https://example.com/games.xml"]
browse-pages = ["https://example.com/games"]

[user-agent]
crawler-name = "atelier-rank"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./atelier.db"

[[seeds]]
handle = "testdev"
profile-url = "https://testdev.example.com"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetch.min_delay_ms, 500);
        assert_eq!(config.crawl.page_cap, 10);
        assert_eq!(config.enrich.budget, 25);
        assert_eq!(config.scoring.min_votes_prior, 5);
        assert_eq!(config.discovery.feeds.len(), 1);
        assert_eq!(config.seeds.len(), 1);
        assert_eq!(config.seeds[0].handle, "testdev");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawl]
page-cap = 0

[user-agent]
crawler-name = "atelier-rank"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[storage]
database-path = "./atelier.db"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
