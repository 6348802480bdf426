// Core infrastructure module
// Application state, configuration, events and the host boundary

pub mod app;
pub mod app_config;
pub mod events;
pub mod host;
pub mod work_queue;

pub use app::{App, InputPrompt, InputState, LinkSummary, Services, StatusView, SyncReport};
pub use app_config::AppConfig;
pub use events::{AppEvent, Command, EventHandler};
pub use host::{Host, SystemHost};
pub use work_queue::{WorkQueue, WorkSender};
