use crate::config::types::{Config, CrawlConfig, OutputConfig, SessionConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_session_config(&config.session)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl behavior configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|_| ConfigError::InvalidUrl(config.base_url.clone()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(config.base_url.clone()));
    }

    if config.concurrency < 1 || config.concurrency > 16 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 16, got {}",
            config.concurrency
        )));
    }

    if config.jitter_min_ms > config.jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "jitter window is inverted: min {}ms > max {}ms",
            config.jitter_min_ms, config.jitter_max_ms
        )));
    }

    if config.page_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "page_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates automation session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    Url::parse(&config.webdriver_url)
        .map_err(|_| ConfigError::InvalidUrl(config.webdriver_url.clone()))?;

    if !config.proxy_url.is_empty() {
        let proxy = Url::parse(&config.proxy_url)
            .map_err(|_| ConfigError::InvalidUrl(config.proxy_url.clone()))?;
        if proxy.host_str().is_none() || proxy.port().is_none() {
            return Err(ConfigError::Validation(format!(
                "proxy_url must carry an explicit host and port, got '{}'",
                config.proxy_url
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output locations
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }
    if config.db_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "db_path cannot be empty".to_string(),
        ));
    }
    if config.source_tag.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source_tag cannot be empty".to_string(),
        ));
    }
    Ok(())
}
