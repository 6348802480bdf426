// UI Styles
// Color schemes and styling for the TUI

use ratatui::style::{Color, Modifier, Style};

use crate::dashboard::NotificationLevel;
use crate::operations::{LegalAction, RegistrationState};

/// Application color scheme and styles
pub struct Styles;

impl Styles {
    // === Header / Footer ===

    pub fn header() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn footer() -> Style {
        Style::default().fg(Color::Yellow)
    }

    // === Status Panel ===

    pub fn label() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn value() -> Style {
        Style::default().fg(Color::White)
    }

    pub fn muted() -> Style {
        Style::default().fg(Color::Rgb(128, 128, 128))
    }

    pub fn count(n: usize) -> Style {
        if n == 0 {
            Self::muted()
        } else {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        }
    }

    pub fn legal_action(action: LegalAction) -> Style {
        let color = match action {
            LegalAction::None => return Self::muted(),
            LegalAction::Commit => Color::Yellow,
            LegalAction::Push => Color::Green,
            LegalAction::Pull => Color::Cyan,
            LegalAction::Sync => Color::Magenta,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn registration(state: RegistrationState) -> Style {
        match state {
            RegistrationState::Registered => Style::default().fg(Color::Green),
            RegistrationState::NoCredential => Style::default().fg(Color::Red),
            _ => Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        }
    }

    // === Popups ===

    pub fn notification(level: NotificationLevel) -> Style {
        let color = match level {
            NotificationLevel::Info => Color::Cyan,
            NotificationLevel::Warning => Color::Yellow,
            NotificationLevel::Error => Color::Red,
            NotificationLevel::Fatal => Color::LightRed,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn input() -> Style {
        Style::default().fg(Color::White)
    }

    // === Border Styles ===

    pub fn border() -> Style {
        Style::default().fg(Color::Rgb(102, 102, 102))
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Color::Cyan)
    }
}
