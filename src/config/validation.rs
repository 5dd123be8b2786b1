use crate::config::types::{
    Config, CrawlConfig, DiscoveryConfig, EnrichConfig, FetchConfig, ScoringConfig, SeedEntry,
    StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch(&config.fetch)?;
    validate_crawl(&config.crawl)?;
    validate_enrich(&config.enrich)?;
    validate_scoring(&config.scoring)?;
    validate_discovery(&config.discovery)?;
    validate_user_agent(&config.user_agent)?;
    validate_storage(&config.storage)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

fn validate_fetch(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "fetch.min-delay-ms must be >= 100ms, got {}ms",
            config.min_delay_ms
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "fetch.max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch.timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawl(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.page_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "crawl.page-cap must be >= 1, got {}",
            config.page_cap
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "crawl.workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    Ok(())
}

fn validate_enrich(config: &EnrichConfig) -> Result<(), ConfigError> {
    if config.budget < 1 {
        return Err(ConfigError::Validation(format!(
            "enrich.budget must be >= 1, got {}",
            config.budget
        )));
    }

    if config.hidden_cooldown_days < 1 {
        return Err(ConfigError::Validation(format!(
            "enrich.hidden-cooldown-days must be >= 1, got {}",
            config.hidden_cooldown_days
        )));
    }

    if config.stale_after_days < 1 {
        return Err(ConfigError::Validation(format!(
            "enrich.stale-after-days must be >= 1, got {}",
            config.stale_after_days
        )));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "enrich.workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    Ok(())
}

fn validate_scoring(config: &ScoringConfig) -> Result<(), ConfigError> {
    if config.min_votes_prior < 1 {
        return Err(ConfigError::Validation(
            "scoring.min-votes-prior must be >= 1".to_string(),
        ));
    }

    if !(0.0..=5.0).contains(&config.prior_mean) {
        return Err(ConfigError::Validation(format!(
            "scoring.prior-mean must be within [0, 5], got {}",
            config.prior_mean
        )));
    }

    Ok(())
}

fn validate_discovery(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    for feed in &config.feeds {
        Url::parse(feed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid feed URL '{}': {}", feed, e)))?;
    }

    for page in &config.browse_pages {
        Url::parse(page).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid browse page URL '{}': {}", page, e))
        })?;
    }

    if config.browse_page_cap < 1 {
        return Err(ConfigError::Validation(
            "discovery.browse-page-cap must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_storage(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    for seed in seeds {
        if seed.handle.is_empty() {
            return Err(ConfigError::Validation(
                "seed handle cannot be empty".to_string(),
            ));
        }

        Url::parse(&seed.profile_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid profile-url for seed '{}': {}",
                seed.handle, e
            ))
        })?;
    }

    Ok(())
}

/// Basic email shape check: one '@' with something on both sides and a dot
/// in the domain part.
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "contact-email does not look like an email address: '{}'",
            email
        )));
    }
    Ok(())
}
