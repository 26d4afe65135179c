use crate::config::types::{CatalogConfig, Config, HarvestConfig, IdentityConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Placeholder substituted with the record identifier in `url-template`
pub const ID_PLACEHOLDER: &str = "{id}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_harvest_config(&config.harvest)?;
    validate_identity_config(&config.identity)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the catalog description
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    if !config.url_template.contains(ID_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "url_template must contain the {} placeholder, got '{}'",
            ID_PLACEHOLDER, config.url_template
        )));
    }

    let sample_url = config.url_template.replace(ID_PLACEHOLDER, "1");
    let url = Url::parse(&sample_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url_template: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "url_template must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.not_found_marker.is_empty() {
        return Err(ConfigError::Validation(
            "not_found_marker cannot be empty".to_string(),
        ));
    }

    if config.id_min < 1 {
        return Err(ConfigError::Validation(
            "id_min must be a positive identifier".to_string(),
        ));
    }

    if config.id_min > config.id_max {
        return Err(ConfigError::Validation(format!(
            "id_min ({}) must not exceed id_max ({})",
            config.id_min, config.id_max
        )));
    }

    Ok(())
}

/// Validates harvest loop settings
///
/// A sample larger than the identifier range is deliberately not checked here:
/// the sampler reports it as `InvalidSampleSize` before any fetch happens.
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.target < 1 {
        return Err(ConfigError::Validation(format!(
            "target must be >= 1, got {}",
            config.target
        )));
    }

    if config.effective_sample_size() < config.target {
        return Err(ConfigError::Validation(format!(
            "sample_size ({}) must be >= target ({})",
            config.effective_sample_size(),
            config.target
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min_delay_ms ({}ms) must not exceed max_delay_ms ({}ms)",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates the request identity
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(referer) = &config.referer {
        Url::parse(referer)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_path.is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    if let Some(checkpoint) = &config.checkpoint_path {
        if checkpoint.is_empty() {
            return Err(ConfigError::Validation(
                "checkpoint_path cannot be empty when set".to_string(),
            ));
        }
        if checkpoint == &config.output_path {
            return Err(ConfigError::Validation(
                "checkpoint_path must differ from output_path".to_string(),
            ));
        }
    }

    Ok(())
}
