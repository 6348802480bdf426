// Git Sync Manager Library
// Keeps a local working copy in sync with its GitHub remote

// Core infrastructure - application state, config, events
pub mod core;

// Operations - git, GitHub API, OAuth and the sync engine
pub mod operations;

// UI - TUI views
pub mod ui;

// Utilities - helper functions and tools
pub mod utilities;

// Activity log and notifications
pub mod dashboard;

// Application constants
pub mod constants;

// Settings overlay and validation
pub mod config;
pub mod config_validation;

// Tracing subscriber setup
pub mod logging;

// Re-export commonly used items for convenience
pub use crate::core::{App, AppConfig, Command, Host, Services, StatusView};
pub use dashboard::DashboardState;
pub use operations::{CredentialStore, GitOps, SyncEngine};
