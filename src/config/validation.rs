use crate::config::types::{
    AgentsConfig, AnalyticsConfig, Config, PlatformConfig, PollingConfig, SourceConfig,
};
use crate::ConfigError;
use url::Url;

/// Placeholders the storage template must contain
const STORAGE_PLACEHOLDERS: [&str; 3] = ["{orgS3Folder}", "{s3Folder}", "{filename}"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_platform_config(&config.platform)?;
    validate_agents_config(&config.agents)?;
    validate_polling_config(&config.polling)?;
    validate_analytics_config(&config.analytics)?;
    validate_source_config(&config.source)?;
    Ok(())
}

/// Validates platform connection settings
fn validate_platform_config(config: &PlatformConfig) -> Result<(), ConfigError> {
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::Validation("api_key cannot be empty".to_string()));
    }

    validate_endpoint("launch_endpoint", &config.launch_endpoint)?;
    validate_endpoint("fetch_endpoint", &config.fetch_endpoint)?;
    validate_endpoint("container_endpoint", &config.container_endpoint)?;

    for placeholder in STORAGE_PLACEHOLDERS {
        if !config.storage_template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "storage_template must contain {}, got '{}'",
                placeholder, config.storage_template
            )));
        }
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.output_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "output_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates agent identifiers
fn validate_agents_config(config: &AgentsConfig) -> Result<(), ConfigError> {
    if config.company_scraper.trim().is_empty() {
        return Err(ConfigError::Validation(
            "company_scraper agent id cannot be empty".to_string(),
        ));
    }

    if config.discovery.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discovery agent id cannot be empty".to_string(),
        ));
    }

    if config.output_filename.is_empty() || config.output_filename.contains('/') {
        return Err(ConfigError::Validation(format!(
            "output_filename must be a non-empty file name, got '{}'",
            config.output_filename
        )));
    }

    Ok(())
}

/// Validates poll loop timing
fn validate_polling_config(config: &PollingConfig) -> Result<(), ConfigError> {
    let delays = [
        ("base_interval_secs", config.base_interval_secs),
        ("http_error_delay_secs", config.http_error_delay_secs),
        ("timeout_delay_secs", config.timeout_delay_secs),
        ("unexpected_error_delay_secs", config.unexpected_error_delay_secs),
    ];

    for (name, value) in delays {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be >= 1", name)));
        }
    }

    // Sleeps are clamped to the remaining budget, so any ceiling of 1 s or more works
    if config.maximum_runtime_secs == 0 {
        return Err(ConfigError::Validation(
            "maximum_runtime_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates analytics settings
fn validate_analytics_config(config: &AnalyticsConfig) -> Result<(), ConfigError> {
    validate_endpoint("analytics base_url", &config.base_url)
}

/// Validates source identity settings
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    if config.domain_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "domain_marker cannot be empty".to_string(),
        ));
    }

    if config.url_channels.is_empty() {
        return Err(ConfigError::Validation(
            "url_channels must list at least one field type".to_string(),
        ));
    }

    Ok(())
}

/// Validates that an endpoint parses and uses an HTTP scheme
fn validate_endpoint(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}
