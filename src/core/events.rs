// Event Handling
// Commands the core understands and the key bindings that produce them

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use std::path::PathBuf;

/// Everything the user can ask the core to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stage all changes and commit them with the message
    Commit(String),
    Push,
    /// Fast-forward or merge, keeping local hunks on conflict
    Pull,
    /// Merge keeping the remote's hunks on conflict, then push
    MergeTheirs,
    /// Merge keeping the local hunks on conflict, then push
    MergeOurs,
    Register,
    Deregister,
    /// Recompute the status now and refetch if the fetch period allows
    Refresh,
    /// The active working file changed
    OpenWorkingFile(PathBuf),
    /// Create a presentation repository from the template and clone it
    SetupPresentation { name: String, dir: PathBuf },
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Commit(_) => "Commit",
            Command::Push => "Push",
            Command::Pull => "Pull",
            Command::MergeTheirs => "Merge (keep remote)",
            Command::MergeOurs => "Merge (keep local)",
            Command::Register => "Register",
            Command::Deregister => "Deregister",
            Command::Refresh => "Refresh",
            Command::OpenWorkingFile(_) => "Open",
            Command::SetupPresentation { .. } => "New presentation",
        }
    }

    /// Needs the access token or the identity behind it
    pub fn needs_credential(&self) -> bool {
        matches!(
            self,
            Command::Commit(_)
                | Command::Push
                | Command::Pull
                | Command::MergeTheirs
                | Command::MergeOurs
                | Command::SetupPresentation { .. }
        )
    }

    /// Must not run while the working tree has uncommitted changes
    pub fn needs_clean_tree(&self) -> bool {
        matches!(
            self,
            Command::Push | Command::Pull | Command::MergeTheirs | Command::MergeOurs
        )
    }
}

/// Application events produced from terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,

    /// Dispatch a command directly
    Trigger(Command),

    /// Run whatever `legal_action` currently offers
    PerformLegalAction,

    /// Start typing a commit message
    BeginCommitMessage,

    /// Start typing the name of a new presentation repository
    BeginPresentationName,

    /// Re-read the working file given on the command line
    ReopenWorkingFile,

    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,

    /// Close the notification popup
    Dismiss,

    ScrollUp(usize),
    ScrollDown(usize),

    None,
}

/// Event handler that converts terminal events to application events
pub struct EventHandler;

impl EventHandler {
    /// Convert a crossterm event; `input_active` routes keys to the text prompt
    pub fn handle(event: Event, input_active: bool) -> AppEvent {
        match event {
            Event::Key(key) if input_active => Self::handle_input_key(key),
            Event::Key(key) => Self::handle_key(key),
            Event::Mouse(mouse) => Self::handle_mouse(mouse),
            _ => AppEvent::None,
        }
    }

    fn handle_key(key: KeyEvent) -> AppEvent {
        if key.kind != KeyEventKind::Press {
            return AppEvent::None;
        }

        match key.code {
            KeyCode::Char('q') => AppEvent::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => AppEvent::Quit,

            KeyCode::Enter | KeyCode::Char(' ') => AppEvent::PerformLegalAction,
            KeyCode::Char('c') => AppEvent::BeginCommitMessage,
            KeyCode::Char('p') => AppEvent::Trigger(Command::Push),
            KeyCode::Char('l') => AppEvent::Trigger(Command::Pull),
            KeyCode::Char('t') => AppEvent::Trigger(Command::MergeTheirs),
            KeyCode::Char('m') => AppEvent::Trigger(Command::MergeOurs),

            KeyCode::Char('g') => AppEvent::Trigger(Command::Register),
            KeyCode::Char('x') => AppEvent::Trigger(Command::Deregister),
            KeyCode::Char('n') => AppEvent::BeginPresentationName,

            KeyCode::Char('r') => AppEvent::Trigger(Command::Refresh),
            KeyCode::Char('o') => AppEvent::ReopenWorkingFile,

            KeyCode::Esc => AppEvent::Dismiss,
            KeyCode::Up => AppEvent::ScrollUp(1),
            KeyCode::Down => AppEvent::ScrollDown(1),
            KeyCode::PageUp => AppEvent::ScrollUp(10),
            KeyCode::PageDown => AppEvent::ScrollDown(10),

            _ => AppEvent::None,
        }
    }

    fn handle_input_key(key: KeyEvent) -> AppEvent {
        if key.kind != KeyEventKind::Press {
            return AppEvent::None;
        }

        match key.code {
            KeyCode::Enter => AppEvent::InputSubmit,
            KeyCode::Esc => AppEvent::InputCancel,
            KeyCode::Backspace => AppEvent::InputBackspace,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppEvent::InputCancel
            }
            KeyCode::Char(c) => AppEvent::InputChar(c),
            _ => AppEvent::None,
        }
    }

    fn handle_mouse(mouse: MouseEvent) -> AppEvent {
        match mouse.kind {
            MouseEventKind::ScrollUp => AppEvent::ScrollUp(3),
            MouseEventKind::ScrollDown => AppEvent::ScrollDown(3),
            _ => AppEvent::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_normal_mode_bindings() {
        assert_eq!(EventHandler::handle(key(KeyCode::Char('q')), false), AppEvent::Quit);
        assert_eq!(
            EventHandler::handle(key(KeyCode::Char('p')), false),
            AppEvent::Trigger(Command::Push)
        );
        assert_eq!(
            EventHandler::handle(key(KeyCode::Char('t')), false),
            AppEvent::Trigger(Command::MergeTheirs)
        );
        assert_eq!(
            EventHandler::handle(key(KeyCode::Enter), false),
            AppEvent::PerformLegalAction
        );
        assert_eq!(
            EventHandler::handle(key(KeyCode::Char('c')), false),
            AppEvent::BeginCommitMessage
        );
    }

    #[test]
    fn test_input_mode_captures_letters() {
        assert_eq!(
            EventHandler::handle(key(KeyCode::Char('q')), true),
            AppEvent::InputChar('q')
        );
        assert_eq!(EventHandler::handle(key(KeyCode::Enter), true), AppEvent::InputSubmit);
        assert_eq!(EventHandler::handle(key(KeyCode::Esc), true), AppEvent::InputCancel);
    }

    #[test]
    fn test_command_gates() {
        assert!(Command::Push.needs_clean_tree());
        assert!(Command::MergeOurs.needs_clean_tree());
        assert!(!Command::Commit("msg".to_string()).needs_clean_tree());
        assert!(Command::Commit("msg".to_string()).needs_credential());
        assert!(!Command::Refresh.needs_credential());
        assert!(!Command::Register.needs_credential());
        assert!(Command::SetupPresentation {
            name: "talk".to_string(),
            dir: PathBuf::from("talk"),
        }
        .needs_credential());
    }
}
