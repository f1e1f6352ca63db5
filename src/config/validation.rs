use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_max_active_downloads(config.max_active_downloads)?;

    if config.max_content_length == 0 {
        return Err(ConfigError::Validation(
            "max_content_length must be >= 1 byte".to_string(),
        ));
    }

    if config.max_urls == 0 {
        return Err(ConfigError::Validation(
            "max_urls must be >= 1".to_string(),
        ));
    }

    for media_type in &config.accepted_media_types {
        validate_media_type(media_type)?;
    }

    Ok(())
}

/// Validates the global download cap
pub(crate) fn validate_max_active_downloads(max_active_downloads: usize) -> Result<(), ConfigError> {
    if max_active_downloads < 1 {
        return Err(ConfigError::Validation(format!(
            "max_active_downloads must be >= 1, got {}",
            max_active_downloads
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

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.prefix.contains('/') || config.prefix.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "prefix must not contain path separators, got '{}'",
            config.prefix
        )));
    }

    Ok(())
}

/// Validates a `type/subtype` media type entry
fn validate_media_type(media_type: &str) -> Result<(), ConfigError> {
    match media_type.split_once('/') {
        Some((kind, subtype))
            if !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/') =>
        {
            Ok(())
        }
        _ => Err(ConfigError::Validation(format!(
            "accepted media type must look like 'type/subtype', got '{}'",
            media_type
        ))),
    }
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
