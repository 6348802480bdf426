// UI module
// Terminal views for the sync status, activity log and prompts

pub mod app_view;
pub mod styles;

use anyhow::Result;
use crossterm::event;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;

use crate::core::{App, AppEvent, EventHandler, InputPrompt};

pub use app_view::render_app;
pub use styles::Styles;

/// Run the main application event loop
pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<()> {
    let tick = app.config.ui.tick;
    loop {
        // Apply finished background work before drawing
        app.tick();

        terminal.draw(|f| render_app(f, app))?;

        if event::poll(tick)? {
            let event = event::read()?;
            let app_event = EventHandler::handle(event, app.input.is_some());

            handle_event(app, app_event);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Handle an application event
pub fn handle_event(app: &mut App, event: AppEvent) {
    // A pending notification swallows everything but quit and dismiss
    if app.dashboard.current_notification().is_some()
        && !matches!(event, AppEvent::Quit | AppEvent::Dismiss | AppEvent::None)
    {
        app.dashboard.dismiss_notification();
        return;
    }

    match event {
        AppEvent::Quit => app.should_quit = true,
        AppEvent::Trigger(command) => app.trigger(command),
        AppEvent::PerformLegalAction => app.perform_legal_action(),
        AppEvent::BeginCommitMessage => app.begin_input(InputPrompt::CommitMessage),
        AppEvent::BeginPresentationName => app.begin_input(InputPrompt::PresentationName),
        AppEvent::ReopenWorkingFile => app.reopen_working_file(),
        AppEvent::InputChar(c) => {
            if let Some(input) = app.input.as_mut() {
                input.buffer.push(c);
            }
        }
        AppEvent::InputBackspace => {
            if let Some(input) = app.input.as_mut() {
                input.buffer.pop();
            }
        }
        AppEvent::InputSubmit => app.submit_input(),
        AppEvent::InputCancel => app.cancel_input(),
        AppEvent::Dismiss => {
            app.dashboard.dismiss_notification();
        }
        AppEvent::ScrollUp(amount) => app.dashboard.scroll_output_up(amount),
        AppEvent::ScrollDown(amount) => app.dashboard.scroll_output_down(amount),
        AppEvent::None => {}
    }
}
