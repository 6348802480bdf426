// Application Configuration
// Defaults compiled from config.yaml at build time
// settings.yaml overrides are applied on top by crate::config

use std::time::Duration;

// Include the auto-generated config from build.rs
pub mod compiled {
    include!(concat!(env!("OUT_DIR"), "/compiled_config.rs"));
}

/// Application-level configuration for git-sync-manager
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OAuth application and callback listener settings
    pub oauth: OAuthSettings,

    /// GitHub REST endpoints and presentation template
    pub github: GithubSettings,

    /// Fetch throttling and clone retry
    pub sync: SyncSettings,

    /// Terminal host settings
    pub ui: UiSettings,
}

#[derive(Clone)]
pub struct OAuthSettings {
    /// Public client identifier of the OAuth application
    pub client_id: String,

    /// Client secret used for the code exchange
    pub client_secret: String,

    pub authorization_base_url: String,
    pub token_url: String,

    /// Base of the per-application authorization page opened on revocation
    pub apps_settings_url: String,

    /// Address the one-shot callback listener binds to
    pub callback_host: String,
    pub callback_port: u16,

    /// Requested scopes, joined with commas in the authorization URL
    pub scopes: Vec<String>,
}

// The secret never reaches logs
impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_base_url", &self.authorization_base_url)
            .field("token_url", &self.token_url)
            .field("apps_settings_url", &self.apps_settings_url)
            .field("callback_host", &self.callback_host)
            .field("callback_port", &self.callback_port)
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub api_base_url: String,
    pub api_version: String,

    /// Template repository new presentation repositories are generated from
    pub template_owner: String,
    pub template_name: String,

    /// Source the pages build is configured with
    pub pages_branch: String,
    pub pages_path: String,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Minimum time between two background fetches of the same link
    pub fetch_period: Duration,

    /// Delay before the clone is retried
    pub clone_retry_delay: Duration,

    /// Total clone attempts, first one included
    pub clone_retry_attempts: u32,

    /// How long a computed SyncStatus is reused before it is recomputed
    pub status_debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct UiSettings {
    /// Main loop tick: queue drain, status refresh, redraw
    pub tick: Duration,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            client_id: compiled::CLIENT_ID.to_string(),
            client_secret: compiled::CLIENT_SECRET.to_string(),
            authorization_base_url: compiled::AUTHORIZATION_BASE_URL.to_string(),
            token_url: compiled::TOKEN_URL.to_string(),
            apps_settings_url: compiled::APPS_SETTINGS_URL.to_string(),
            callback_host: compiled::CALLBACK_HOST.to_string(),
            callback_port: compiled::CALLBACK_PORT,
            scopes: compiled::SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_base_url: compiled::API_BASE_URL.to_string(),
            api_version: compiled::API_VERSION.to_string(),
            template_owner: compiled::TEMPLATE_OWNER.to_string(),
            template_name: compiled::TEMPLATE_NAME.to_string(),
            pages_branch: compiled::PAGES_BRANCH.to_string(),
            pages_path: compiled::PAGES_PATH.to_string(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            fetch_period: Duration::from_secs(compiled::FETCH_PERIOD_SECS),
            clone_retry_delay: Duration::from_secs(compiled::CLONE_RETRY_DELAY_SECS),
            clone_retry_attempts: compiled::CLONE_RETRY_ATTEMPTS,
            status_debounce: Duration::from_millis(compiled::STATUS_DEBOUNCE_MS),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(compiled::TICK_MS),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            oauth: OAuthSettings::default(),
            github: GithubSettings::default(),
            sync: SyncSettings::default(),
            ui: UiSettings::default(),
        }
    }
}
