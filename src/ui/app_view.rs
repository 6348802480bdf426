// Application View
// Main application layout and rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame,
};

use super::Styles;
use crate::core::{App, InputState};
use crate::dashboard::{DashboardState, Notification};

/// Render the entire application
pub fn render_app(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)])
        .split(chunks[1]);
    render_status(f, app, main_chunks[0]);
    render_output(f, &app.dashboard, main_chunks[1]);

    render_footer(f, app, chunks[2]);

    if let Some(input) = &app.input {
        render_input(f, input, f.area());
    } else if let Some(notification) = app.dashboard.current_notification() {
        render_notification(f, notification, f.area());
    }
}

/// Render the header bar
fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let title = match &app.working_file {
        Some(path) => format!("Git Sync Manager  {}", path.display()),
        None => "Git Sync Manager".to_string(),
    };
    let header = Paragraph::new(title)
        .style(Styles::header())
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn row<'a>(label: &'a str, value: impl Into<String>, style: ratatui::style::Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{label:<12}"), Styles::label()),
        Span::styled(value.into(), style),
    ])
}

/// Registration, repository and sync counters
fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let view = app.view();
    let mut lines = Vec::new();

    let account = match (view.registration, app.credentials.get()) {
        (crate::operations::RegistrationState::Registered, Some(credential)) => {
            credential.owner_login.clone()
        }
        (state, _) => state.description().to_string(),
    };
    lines.push(row("Account", account, Styles::registration(view.registration)));
    lines.push(Line::default());

    match &app.link_summary {
        Some(summary) => {
            lines.push(row(
                "Repository",
                summary.local_path.display().to_string(),
                Styles::value(),
            ));
            let remote = if summary.has_remote() {
                summary.remote.clone()
            } else {
                "none".to_string()
            };
            lines.push(row("Remote", remote, Styles::value()));
            if let Some(pages) = &summary.pages_url {
                lines.push(row("Pages", pages.clone(), Styles::value()));
            }
        }
        None => lines.push(row("Repository", "none", Styles::muted())),
    }
    lines.push(Line::default());

    lines.push(row(
        "Changes",
        view.pending_local_changes.to_string(),
        Styles::count(view.pending_local_changes),
    ));
    lines.push(row("Ahead", view.ahead.to_string(), Styles::count(view.ahead)));
    lines.push(row("Behind", view.behind.to_string(), Styles::count(view.behind)));
    if let Some(err) = &app.status_error {
        lines.push(row("Status", err.clone(), Styles::muted()));
    }
    lines.push(Line::default());

    let action = match &app.in_flight {
        Some(command) => format!("{}…", command.label()),
        None => view.legal_action.label().to_string(),
    };
    lines.push(row("Action", action, Styles::legal_action(view.legal_action)));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Status ")
        .border_style(Styles::border())
        .padding(Padding::new(1, 1, 0, 0));
    let panel = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

/// Scrollable activity log
fn render_output(f: &mut Frame, dashboard: &DashboardState, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Output ")
        .border_style(Styles::border())
        .padding(Padding::new(1, 1, 0, 0));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible_height = inner.height as usize;
    let total_lines = dashboard.output_lines.len();
    let start = dashboard.visible_offset(visible_height);
    let end = (start + visible_height).min(total_lines);

    let lines: Vec<Line> = if total_lines == 0 {
        vec![Line::from(Span::styled("No output yet.", Styles::muted()))]
    } else {
        dashboard.output_lines[start..end]
            .iter()
            .map(|line| Line::from(line.as_str()))
            .collect()
    };

    let scrolling = total_lines > visible_height;
    let content_area = if scrolling {
        // Leave one column for the scrollbar
        Rect {
            width: inner.width.saturating_sub(1),
            ..inner
        }
    } else {
        inner
    };
    f.render_widget(Paragraph::new(lines).style(Styles::value()), content_area);

    if scrolling {
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            width: 1,
            ..inner
        };
        let mut state = ScrollbarState::new(total_lines.saturating_sub(visible_height))
            .viewport_content_length(visible_height)
            .position(start);
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));
        f.render_stateful_widget(scrollbar, scrollbar_area, &mut state);
    }
}

/// Render the footer bar
fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.input.is_some() {
        "Enter: Confirm | Esc: Cancel | Backspace: Delete"
    } else if app.dashboard.current_notification().is_some() {
        "Esc / any key: Dismiss | q: Quit"
    } else {
        "q: Quit | Enter: Action | c: Commit | p: Push | l: Pull | t/m: Merge keep remote/local | g/x: Register/Deregister | n: New presentation | r: Refresh"
    };

    let footer = Paragraph::new(help_text)
        .style(Styles::footer())
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

/// Centered rect of at most `width` x `height` inside `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_notification(f: &mut Frame, notification: &Notification, area: Rect) {
    let popup = centered(area, 70, 9);
    let title = format!(" {} ({}) ", notification.title, notification.level.tag());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(title, Styles::notification(notification.level)))
        .border_style(Styles::notification(notification.level))
        .padding(Padding::new(1, 1, 1, 0));
    let body = Paragraph::new(notification.message.as_str())
        .block(block)
        .style(Styles::value())
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, popup);
    f.render_widget(body, popup);
}

fn render_input(f: &mut Frame, input: &InputState, area: Rect) {
    let popup = centered(area, 70, 3);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", input.prompt.title()))
        .border_style(Styles::border_focused());
    let text = Paragraph::new(format!("{}_", input.buffer))
        .block(block)
        .style(Styles::input());

    f.render_widget(Clear, popup);
    f.render_widget(text, popup);
}
