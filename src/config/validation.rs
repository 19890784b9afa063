use crate::config::types::{
    Config, LastPageConfig, RemoteConfig, RetryConfig, ScheduleConfig, ScrapeConfig,
    StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// WordPress rejects larger `per_page` values
const MAX_PER_PAGE: u32 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_remote_config(&config.remote)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_retry_config(&config.retry)?;
    validate_scrape_config(&config.scrape)?;
    validate_last_page_config(&config.last_page)?;
    validate_storage_config(&config.storage)?;
    validate_schedule_config(&config.schedule)?;
    Ok(())
}

fn validate_remote_config(config: &RemoteConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;
    validate_http_url("search_base_url", &config.search_base_url)?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.per_page < 1 || config.per_page > MAX_PER_PAGE {
        return Err(ConfigError::Validation(format!(
            "per_page must be between 1 and {}, got {}",
            MAX_PER_PAGE, config.per_page
        )));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, value
        )));
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial_backoff_ms ({}) cannot exceed max_backoff_ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

fn validate_scrape_config(config: &ScrapeConfig) -> Result<(), ConfigError> {
    if config.max_search_page_count < 1 {
        return Err(ConfigError::Validation(
            "max_search_page_count must be >= 1".to_string(),
        ));
    }

    if config.default_search_page_count < 1
        || config.default_search_page_count > config.max_search_page_count
    {
        return Err(ConfigError::Validation(format!(
            "default_search_page_count must be between 1 and {}, got {}",
            config.max_search_page_count, config.default_search_page_count
        )));
    }

    if config.image_extension.is_empty() || config.image_extension.contains('/') {
        return Err(ConfigError::Validation(format!(
            "image_extension must be a non-empty file suffix, got '{}'",
            config.image_extension
        )));
    }

    if config.search_result_class.trim().is_empty() || config.latest_post_class.trim().is_empty()
    {
        return Err(ConfigError::Validation(
            "anchor class names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_last_page_config(config: &LastPageConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("posts", config.posts),
        ("categories", config.categories),
        ("authors", config.authors),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "last-page.{} must be >= 1",
                name
            )));
        }
    }
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.media_root.is_empty() {
        return Err(ConfigError::Validation(
            "media_root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.keyword_items_interval_secs < 1
        || config.daily_items_interval_secs < 1
        || config.auto_scrap_interval_secs < 1
    {
        return Err(ConfigError::Validation(
            "schedule intervals must be >= 1 second".to_string(),
        ));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
