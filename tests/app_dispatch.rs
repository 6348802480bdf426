// Command dispatch through the application context: gating on the UI
// thread, background execution and results coming back through the queue

mod common;

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{credential, remote_repo, MockGithubClient, RemoteFixture};
use git_sync_manager::core::{App, AppConfig, Command, Host, Services};
use git_sync_manager::dashboard::NotificationLevel;
use git_sync_manager::operations::{Credential, CredentialStore, LegalAction, RegistrationState};

#[derive(Default)]
struct RecordingHost {
    opened: Mutex<Vec<String>>,
    reloads: Mutex<usize>,
}

impl Host for RecordingHost {
    fn open_url(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }

    fn reload_working_tree(&self) {
        *self.reloads.lock().unwrap() += 1;
    }
}

struct Harness {
    app: App,
    host: Arc<RecordingHost>,
    // Dropped after the app
    _runtime: tokio::runtime::Runtime,
}

fn harness(stored: Option<Credential>) -> Harness {
    let mock = MockGithubClient::with_user("octo");
    mock.add_repo(remote_repo("octo", "deck", "unused"));
    harness_with(stored, mock)
}

fn harness_with(stored: Option<Credential>, mock: MockGithubClient) -> Harness {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut config = AppConfig::default();
    config.sync.status_debounce = Duration::ZERO;

    let services = Services::from_config(&config, Arc::new(mock), None);

    let host = Arc::new(RecordingHost::default());
    let app = App::new(
        config,
        CredentialStore::in_memory(stored),
        services,
        host.clone(),
        runtime.handle().clone(),
    );
    Harness {
        app,
        host,
        _runtime: runtime,
    }
}

fn wait_until(app: &mut App, what: &str, mut done: impl FnMut(&App) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while Instant::now() < deadline {
        app.tick();
        if done(app) {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {what}");
}

fn logged(app: &App, needle: &str) -> bool {
    app.dashboard.output_lines.iter().any(|line| line.contains(needle))
}

/// Registered app linked to a fresh clone
fn linked(dir: &Path) -> Harness {
    let mut h = harness(Some(credential()));
    h.app.start();
    wait_until(&mut h.app, "token validation", |app| {
        app.registration == RegistrationState::Registered
    });

    h.app.trigger(Command::OpenWorkingFile(dir.join("README.md")));
    wait_until(&mut h.app, "remote resolution", |app| logged(app, "Linked to"));
    assert_eq!(
        h.app.link_summary.as_ref().map(|s| s.remote.as_str()),
        Some("octo/deck")
    );
    h
}

#[test]
fn test_unregistered_commands_are_refused() {
    let mut h = harness(None);
    h.app.start();
    assert_eq!(h.app.registration, RegistrationState::NoCredential);

    h.app.trigger(Command::Push);
    assert!(h.app.in_flight.is_none());
    let shown = h.app.dashboard.current_notification().unwrap();
    assert_eq!(shown.level, NotificationLevel::Error);
    assert!(shown.message.contains("not registered"));
    assert_eq!(h.app.view().legal_action, LegalAction::None);
}

#[test]
fn test_invalid_stored_token_is_dropped() {
    // No user behind the token
    let mut h = harness_with(Some(credential()), MockGithubClient::default());
    h.app.start();
    assert_eq!(h.app.registration, RegistrationState::ValidatingToken);
    wait_until(&mut h.app, "validation failure", |app| {
        app.registration == RegistrationState::NoCredential
    });
    assert!(!h.app.credentials.is_registered());
    assert_eq!(
        h.app.dashboard.current_notification().unwrap().level,
        NotificationLevel::Warning
    );
}

#[test]
fn test_dirty_tree_blocks_push_until_committed() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let mut h = linked(&alice);

    fs::write(alice.join("slides.md"), "# draft\n").unwrap();
    h.app.tick();
    assert_eq!(h.app.view().pending_local_changes, 1);
    assert_eq!(h.app.view().legal_action, LegalAction::Commit);

    h.app.trigger(Command::Push);
    assert!(h.app.in_flight.is_none());
    let shown = h.app.dashboard.dismiss_notification().unwrap();
    assert!(shown.message.contains("uncommitted"));

    h.app.trigger(Command::Commit("add slides".to_string()));
    assert_eq!(h.app.in_flight, Some(Command::Commit("add slides".to_string())));
    assert_eq!(h.app.view().legal_action, LegalAction::None);

    // Only one command at a time
    h.app.trigger(Command::Push);
    assert_eq!(
        h.app.dashboard.dismiss_notification().unwrap().level,
        NotificationLevel::Warning
    );

    wait_until(&mut h.app, "commit", |app| app.in_flight.is_none());
    assert!(h.app.dashboard.current_notification().is_none());
    let view = h.app.view();
    assert_eq!((view.pending_local_changes, view.ahead, view.behind), (0, 1, 0));
    assert_eq!(view.legal_action, LegalAction::Push);

    h.app.perform_legal_action();
    assert_eq!(h.app.in_flight, Some(Command::Push));
    wait_until(&mut h.app, "push", |app| app.in_flight.is_none());
    assert!(h.app.dashboard.current_notification().is_none());
    assert_eq!(h.app.view().ahead, 0);
    assert_eq!(h.app.view().legal_action, LegalAction::None);
}

#[test]
fn test_pull_reloads_the_host() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let bob = fixture.clone_as("bob");
    common::commit_file(&bob, "b.md", "bob\n", "bob");
    let bob_repo = git2::Repository::open(&bob).unwrap();
    git_sync_manager::GitOps::push(&bob_repo, "origin", "main", "").unwrap();

    let mut h = linked(&alice);
    assert_eq!(h.app.view().behind, 1);
    assert_eq!(h.app.view().legal_action, LegalAction::Pull);

    h.app.perform_legal_action();
    wait_until(&mut h.app, "pull", |app| app.in_flight.is_none());
    assert!(alice.join("b.md").exists());
    assert_eq!(*h.host.reloads.lock().unwrap(), 1);
    assert_eq!(h.app.view().behind, 0);
}

#[test]
fn test_deregister_forgets_credential_and_opens_revocation_page() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let mut h = linked(&alice);

    h.app.trigger(Command::Deregister);
    assert_eq!(h.app.registration, RegistrationState::NoCredential);
    assert!(!h.app.credentials.is_registered());
    assert!(h.app.link_summary.as_ref().is_some_and(|s| !s.resolved));

    let client_id = &h.app.config.oauth.client_id;
    let opened = h.host.opened.lock().unwrap();
    assert!(opened.last().unwrap().ends_with(client_id.as_str()));
    drop(opened);

    h.app.trigger(Command::Pull);
    assert!(h
        .app
        .dashboard
        .current_notification()
        .unwrap()
        .message
        .contains("not registered"));
}

fn link_count(app: &App) -> usize {
    app.dashboard
        .output_lines
        .iter()
        .filter(|line| line.contains("Linked to"))
        .count()
}

#[test]
fn test_reopening_same_repository_respects_fetch_period() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let bob = fixture.clone_as("bob");
    let mut h = linked(&alice);
    assert!(h.app.config.sync.fetch_period >= Duration::from_secs(5));

    // Any fetch from here on fails
    fs::rename(&fixture.remote_path, fixture.remote_path.with_extension("moved")).unwrap();

    fs::write(alice.join("other.md"), "other\n").unwrap();
    h.app.trigger(Command::OpenWorkingFile(alice.join("other.md")));
    wait_until(&mut h.app, "second link", |app| link_count(app) == 2);
    assert!(!logged(&h.app, "Background fetch failed"));

    // A different repository has no fetch history
    h.app.trigger(Command::OpenWorkingFile(bob.join("README.md")));
    wait_until(&mut h.app, "third link", |app| link_count(app) == 3);
    assert!(logged(&h.app, "Background fetch failed"));
}

#[test]
fn test_working_file_outside_repository() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(None);
    h.app.trigger(Command::OpenWorkingFile(dir.path().join("loose.txt")));
    assert!(h.app.link.is_none());
    assert!(logged(&h.app, "not inside a git repository"));
    assert_eq!(h.app.view().legal_action, LegalAction::None);
}
