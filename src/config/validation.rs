use crate::config::types::{Config, CrawlerConfig, HttpConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on either worker pool
const MAX_POOL_SIZE: usize = 1024;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_http_config(&config.http)?;
    if let Some(hosts) = &config.permitted_hosts {
        for pattern in hosts {
            validate_host_pattern(pattern)?;
        }
    }
    Ok(())
}

/// Validates the `[crawler]` section as loaded from a file or the CLI
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.depth < 1 {
        return Err(ConfigError::Validation(format!(
            "depth must be >= 1, got {}",
            config.depth
        )));
    }

    validate_engine_config(config)?;

    for (name, size) in [
        ("downloaders", config.downloaders),
        ("extractors", config.extractors),
    ] {
        if size > MAX_POOL_SIZE {
            return Err(ConfigError::Validation(format!(
                "{} must be at most {}, got {}",
                name, MAX_POOL_SIZE, size
            )));
        }
    }

    if config.shutdown_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "shutdown_timeout_secs must be >= 1, got {}",
            config.shutdown_timeout_secs
        )));
    }

    Ok(())
}

/// Checks what the crawl engine itself cannot run without
///
/// [`crate::WebCrawler::new`] runs only this check: both pools need at
/// least one worker and every host at least one slot.
pub fn validate_engine_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("downloaders", config.downloaders),
        ("extractors", config.extractors),
        ("per_host", config.per_host),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "HTTP timeouts must be >= 1 second".to_string(),
        ));
    }
    Ok(())
}

/// Validates a permitted-host pattern (supports a leading `*.`)
pub fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            pattern
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            pattern
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            pattern
        )));
    }

    Ok(())
}
