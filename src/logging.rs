// Logging
// File-backed tracing subscriber; the terminal belongs to the UI

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::{LOG_ENV_VAR, LOG_FILE_NAME};

/// Keeps the background log writer alive; drop it last
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber writing to `log_dir/git-sync-manager.log`
///
/// `level` becomes the default directive; `GIT_SYNC_LOG` still wins per target.
pub fn init(log_dir: &Path, level: Option<&str>) -> Result<LoggingGuard> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let default_level = match level {
        Some(level) => level
            .parse::<LevelFilter>()
            .with_context(|| format!("Invalid log level: {level}"))?,
        None => LevelFilter::INFO,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}
