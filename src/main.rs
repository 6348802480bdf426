// Git Sync Manager
// TUI that keeps a working copy in sync with its GitHub remote

// IMPORTS ------------------>>

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use git_sync_manager::config::{cache_dir, config_dir, data_dir};
use git_sync_manager::config_validation::load_and_validate_config;
use git_sync_manager::constants::{AVATAR_DIR_NAME, CREDENTIALS_FILE_NAME};
use git_sync_manager::core::{App, Command, Services, SystemHost};
use git_sync_manager::operations::{CredentialStore, RealGithubClient};
use git_sync_manager::{logging, ui, utilities};

//--------------------------------------------------------<<

#[derive(Debug, Parser)]
#[command(name = "git-sync-manager", version, about)]
struct Args {
    /// Working file whose repository is kept in sync
    #[arg(short, long)]
    file: Option<String>,

    /// Settings file to use instead of the per-user settings.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

// ┌──────────────────────────────────────────────────────────────────────────────────────────────────────────────────┐
// │                                                 MAIN ENTRY POINT                                                 │
// └──────────────────────────────────────────────────────────────────────────────────────────────────────────────────┘

fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = logging::init(&data_dir(), args.log_level.as_deref())?;
    let config = load_and_validate_config(args.config.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("git-sync-worker")
        .build()
        .context("Failed to start async runtime")?;

    let credentials = CredentialStore::load(config_dir().join(CREDENTIALS_FILE_NAME))?;
    let api = Arc::new(RealGithubClient::new(&config.github));
    let services = Services::from_config(&config, api, Some(cache_dir().join(AVATAR_DIR_NAME)));

    let mut app = App::new(
        config,
        credentials,
        services,
        Arc::new(SystemHost),
        runtime.handle().clone(),
    );
    app.start();

    if let Some(file) = args.file.as_deref() {
        let path = utilities::absolutize(file)
            .with_context(|| format!("Failed to resolve working file: {file}"))?;
        app.trigger(Command::OpenWorkingFile(path));
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "terminal loop failed");
    }
    info!("shutting down");
    runtime.shutdown_background();
    result
}
