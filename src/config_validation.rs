// Configuration validation module

use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::config::load_config;
use crate::core::AppConfig;

/// A settings value that cannot be used
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("oauth.client_id must not be empty")]
    MissingClientId,

    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("oauth.scopes must list at least one scope")]
    NoScopes,
}

/// Check a loaded configuration, reporting the first problem found
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.oauth.client_id.trim().is_empty() {
        return Err(ConfigError::MissingClientId);
    }
    if config.oauth.scopes.is_empty() {
        return Err(ConfigError::NoScopes);
    }

    for (field, value) in [
        ("oauth.authorization_base_url", &config.oauth.authorization_base_url),
        ("oauth.token_url", &config.oauth.token_url),
        ("oauth.apps_settings_url", &config.oauth.apps_settings_url),
        ("github.api_base_url", &config.github.api_base_url),
    ] {
        if Url::parse(value).is_err() {
            return Err(ConfigError::InvalidUrl {
                field,
                value: value.clone(),
            });
        }
    }

    if config.sync.fetch_period.is_zero() {
        return Err(ConfigError::Zero("sync.fetch_period_secs"));
    }
    if config.sync.clone_retry_attempts == 0 {
        return Err(ConfigError::Zero("sync.clone_retry_attempts"));
    }
    if config.ui.tick.is_zero() {
        return Err(ConfigError::Zero("ui.tick_ms"));
    }

    Ok(())
}

/// Load settings and validate them before anything else starts
pub fn load_and_validate_config(config_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = load_config(config_path)?;
    validate_config(&config)?;
    if config.oauth.client_secret.is_empty() {
        tracing::warn!("no OAuth client secret configured; registration will fail at token exchange");
    }
    Ok(config)
}
