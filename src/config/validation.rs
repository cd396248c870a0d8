use crate::config::types::{Config, ExtractConfig, FetchConfig, OutputConfig, PipelineConfig, TargetConfig};
use crate::url::parse_target_url;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Every check here is fatal: a run never enters the concurrent phase with a
/// configuration that cannot produce a crawlable target.
pub fn validate(config: &mut Config) -> Result<(), ConfigError> {
    validate_target_config(&mut config.target)?;
    validate_extract_config(&config.extract)?;
    validate_fetch_config(&config.fetch)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the listing target and normalizes its URL
fn validate_target_config(config: &mut TargetConfig) -> Result<(), ConfigError> {
    let url = parse_target_url(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target url '{}': {}", config.url, e)))?;
    config.url = url.to_string();

    if config.link_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "link-selector cannot be empty".to_string(),
        ));
    }

    if let Some(rule) = &config.next_page_selector {
        if rule.trim().is_empty() {
            config.next_page_selector = None;
        }
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    if config.content_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "content-selector cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates retry, timeout, and proxy settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.connect_timeout_secs < 1 || config.read_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got connect={}s read={}s",
            config.connect_timeout_secs, config.read_timeout_secs
        )));
    }

    if let Some(source) = &config.proxy_source {
        let url = Url::parse(source)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy-source: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "proxy-source '{}' must use http or https",
                source
            )));
        }
    }

    if config.user_agents.iter().any(|agent| agent.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.listing_page_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "listing-page-attempts must be >= 1, got {}",
            config.listing_page_attempts
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("snapshot-file", &config.snapshot_file),
        ("report-file", &config.report_file),
    ] {
        if value.is_empty() || value.contains('/') || value.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "{} must be a bare file name, got '{}'",
                name, value
            )));
        }
    }

    Ok(())
}
