// Application Constants
// Names shared by the binary, the settings loader and the logging setup

/// Application name, used for config/data directories and the User-Agent header
pub const APP_NAME: &str = "git-sync-manager";

/// Runtime settings overlay file, looked up in the config directory
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// Persisted credential file, looked up in the config directory
pub const CREDENTIALS_FILE_NAME: &str = "credentials.yaml";

/// Log file written by the non-blocking appender
pub const LOG_FILE_NAME: &str = "git-sync-manager.log";

/// Directory under the cache dir that keeps downloaded avatars
pub const AVATAR_DIR_NAME: &str = "avatars";

/// Environment variable holding the tracing filter
pub const LOG_ENV_VAR: &str = "GIT_SYNC_LOG";

/// Environment variable overriding the OAuth client secret
pub const CLIENT_SECRET_ENV_VAR: &str = "GIT_SYNC_CLIENT_SECRET";

/// Password half of the token credential handed to git remotes
pub const TOKEN_PASSWORD: &str = "x-oauth-basic";
