// Configuration loading module
// Overlays an optional settings.yaml onto the compiled defaults

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{APP_NAME, CLIENT_SECRET_ENV_VAR, SETTINGS_FILE_NAME};
use crate::core::AppConfig;

/// Runtime settings file; every field is optional and overrides the compiled default
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub oauth: OAuthOverrides,
    pub github: GithubOverrides,
    pub sync: SyncOverrides,
    pub ui: UiOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OAuthOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorization_base_url: Option<String>,
    pub token_url: Option<String>,
    pub apps_settings_url: Option<String>,
    pub callback_host: Option<String>,
    pub callback_port: Option<u16>,
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubOverrides {
    pub api_base_url: Option<String>,
    pub api_version: Option<String>,
    pub template_owner: Option<String>,
    pub template_name: Option<String>,
    pub pages_branch: Option<String>,
    pub pages_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncOverrides {
    pub fetch_period_secs: Option<u64>,
    pub clone_retry_delay_secs: Option<u64>,
    pub clone_retry_attempts: Option<u32>,
    pub status_debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiOverrides {
    pub tick_ms: Option<u64>,
}

/// Per-user configuration directory (`~/.config/git-sync-manager` on Linux)
pub fn config_dir() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Per-user data directory holding the log file
pub fn data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Per-user cache directory holding downloaded avatars
pub fn cache_dir() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| std::env::temp_dir())
        .join(APP_NAME)
}

/// Load the compiled defaults and overlay settings.yaml
///
/// An explicit path must exist. Without one, the default settings file is
/// optional and a missing file yields the compiled defaults.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut config = AppConfig::default();

    let settings = match config_path {
        Some(path) => Some(read_settings(path)?),
        None => {
            let default_path = config_dir().join(SETTINGS_FILE_NAME);
            if default_path.exists() {
                Some(read_settings(&default_path)?)
            } else {
                None
            }
        }
    };

    if let Some(settings) = settings {
        apply_settings(&mut config, settings);
    }

    if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV_VAR) {
        if !secret.is_empty() {
            config.oauth.client_secret = secret;
        }
    }

    Ok(config)
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    parse_settings(&contents)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Parse settings YAML; an empty document is an empty overlay
pub fn parse_settings(contents: &str) -> Result<SettingsFile> {
    if contents.trim().is_empty() {
        return Ok(SettingsFile::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Apply every present override onto the config
pub fn apply_settings(config: &mut AppConfig, settings: SettingsFile) {
    let SettingsFile { oauth, github, sync, ui } = settings;

    overlay(&mut config.oauth.client_id, oauth.client_id);
    overlay(&mut config.oauth.client_secret, oauth.client_secret);
    overlay(&mut config.oauth.authorization_base_url, oauth.authorization_base_url);
    overlay(&mut config.oauth.token_url, oauth.token_url);
    overlay(&mut config.oauth.apps_settings_url, oauth.apps_settings_url);
    overlay(&mut config.oauth.callback_host, oauth.callback_host);
    overlay(&mut config.oauth.callback_port, oauth.callback_port);
    overlay(&mut config.oauth.scopes, oauth.scopes);

    overlay(&mut config.github.api_base_url, github.api_base_url);
    overlay(&mut config.github.api_version, github.api_version);
    overlay(&mut config.github.template_owner, github.template_owner);
    overlay(&mut config.github.template_name, github.template_name);
    overlay(&mut config.github.pages_branch, github.pages_branch);
    overlay(&mut config.github.pages_path, github.pages_path);

    overlay(&mut config.sync.fetch_period, sync.fetch_period_secs.map(Duration::from_secs));
    overlay(
        &mut config.sync.clone_retry_delay,
        sync.clone_retry_delay_secs.map(Duration::from_secs),
    );
    overlay(&mut config.sync.clone_retry_attempts, sync.clone_retry_attempts);
    overlay(
        &mut config.sync.status_debounce,
        sync.status_debounce_ms.map(Duration::from_millis),
    );

    overlay(&mut config.ui.tick, ui.tick_ms.map(Duration::from_millis));
}

fn overlay<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
