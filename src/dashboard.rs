// Dashboard state management module
// Activity log and the notification popup queue shown by the terminal host

use chrono::Local;
use std::collections::VecDeque;

/// Maximum log lines to keep in memory
const MAX_OUTPUT_LINES: usize = 1000;

/// Sentinel value to indicate "scroll to bottom" - renderer will calculate actual position
pub const SCROLL_TO_BOTTOM: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    /// The repository needs manual attention
    Fatal,
}

impl NotificationLevel {
    pub fn tag(self) -> &'static str {
        match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warn",
            NotificationLevel::Error => "error",
            NotificationLevel::Fatal => "FATAL",
        }
    }
}

/// A message that blocks the UI until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

/// Dashboard state structure
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub output_lines: Vec<String>,
    pub output_scroll: usize,
    /// When true, new lines automatically scroll to bottom
    pub auto_scroll_enabled: bool,
    notifications: VecDeque<Notification>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            output_lines: Vec::new(),
            output_scroll: SCROLL_TO_BOTTOM,
            auto_scroll_enabled: true,
            notifications: VecDeque::new(),
        }
    }

    /// Scroll up; disables auto-scroll
    pub fn scroll_output_up(&mut self, amount: usize) {
        self.auto_scroll_enabled = false;
        let current = if self.output_scroll == SCROLL_TO_BOTTOM {
            self.output_lines.len().saturating_sub(1)
        } else {
            self.output_scroll
        };
        self.output_scroll = current.saturating_sub(amount);
    }

    /// Scroll down; reaching the last line turns auto-scroll back on
    pub fn scroll_output_down(&mut self, amount: usize) {
        if self.output_scroll == SCROLL_TO_BOTTOM {
            return;
        }
        let last = self.output_lines.len().saturating_sub(1);
        let next = self.output_scroll.saturating_add(amount);
        if next >= last {
            self.auto_scroll_enabled = true;
            self.output_scroll = SCROLL_TO_BOTTOM;
        } else {
            self.output_scroll = next;
        }
    }

    /// Resolve the scroll position for a viewport of `visible_height` lines
    pub fn visible_offset(&self, visible_height: usize) -> usize {
        let max_scroll = self.output_lines.len().saturating_sub(visible_height);
        if self.output_scroll == SCROLL_TO_BOTTOM {
            max_scroll
        } else {
            self.output_scroll.min(max_scroll)
        }
    }

    /// Append a timestamped line, enforcing the size limit
    pub fn add_output_line(&mut self, line: impl AsRef<str>) {
        let stamped = format!("{} {}", Local::now().format("%H:%M:%S"), line.as_ref());
        self.output_lines.push(stamped);

        if self.output_lines.len() > MAX_OUTPUT_LINES {
            let remove_count = self.output_lines.len() - MAX_OUTPUT_LINES;
            self.output_lines.drain(0..remove_count);

            if self.output_scroll != SCROLL_TO_BOTTOM {
                self.output_scroll = self.output_scroll.saturating_sub(remove_count);
            }
        }

        if self.auto_scroll_enabled {
            self.output_scroll = SCROLL_TO_BOTTOM;
        }
    }

    /// Log the notification and queue it for the popup
    pub fn notify(&mut self, level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) {
        let notification = Notification {
            level,
            title: title.into(),
            message: message.into(),
        };
        self.add_output_line(format!(
            "[{}] {}: {}",
            level.tag(),
            notification.title,
            notification.message
        ));
        if level != NotificationLevel::Info {
            self.notifications.push_back(notification);
        }
    }

    /// Notification currently shown, oldest first
    pub fn current_notification(&self) -> Option<&Notification> {
        self.notifications.front()
    }

    pub fn dismiss_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }
}
