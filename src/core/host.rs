// Host Capabilities
// What the surrounding application provides to the sync core

use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Services the embedding application offers
pub trait Host: Send + Sync {
    /// Show `url` to the user, normally in the system browser
    fn open_url(&self, url: &str);

    /// The host holds unsaved edits that should be committed first
    fn is_dirty(&self) -> bool {
        false
    }

    /// Files on disk changed under the host; reopen what it has loaded
    fn reload_working_tree(&self) {}
}

/// Terminal host: opens URLs with the platform launcher, never dirty
#[derive(Debug, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn open_url(&self, url: &str) {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };

        command.arg(url).stdout(Stdio::null()).stderr(Stdio::null());
        match command.spawn() {
            Ok(mut child) => {
                info!(%url, "opened in browser");
                // Reap the launcher off the UI thread
                std::thread::spawn(move || child.wait());
            }
            Err(e) => warn!(%url, error = %e, "could not launch browser"),
        }
    }
}
