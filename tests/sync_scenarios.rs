// Sync engine against a real bare remote on disk: two collaborators
// committing, pushing and pulling the same branch

mod common;

use git2::Repository;
use std::fs;
use std::time::Duration;

use common::{commit_file, credential, head, RemoteFixture};
use git_sync_manager::operations::{Favor, LegalAction, MergeOutcome, SyncEngine, SyncError};

fn engine() -> SyncEngine {
    SyncEngine::new(Duration::from_secs(3600))
}

#[test]
fn test_fresh_clone_is_in_sync() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let link = fixture.link(&alice);

    assert_eq!(link.remote_owner, "octo");
    assert_eq!(link.remote_name, "deck");

    let status = engine().status(&link).unwrap();
    assert_eq!(status.pending_local_changes, 0);
    assert_eq!(engine().pending_sync_changes(&link).unwrap(), (0, 0));
    assert_eq!(SyncEngine::legal_action(&status, false), LegalAction::None);
}

#[test]
fn test_behind_then_fast_forward() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let bob = fixture.clone_as("bob");
    let engine = engine();
    let cred = credential();

    let mut bob_link = fixture.link(&bob);
    commit_file(&bob, "slides.md", "# one\n", "one");
    commit_file(&bob, "slides.md", "# one\n# two\n", "two");
    commit_file(&bob, "slides.md", "# one\n# two\n# three\n", "three");
    engine.push(&mut bob_link, &cred).unwrap();

    let mut alice_link = fixture.link(&alice);
    let before = Repository::open(&alice).unwrap();
    let mut walk = before.revwalk().unwrap();
    walk.push_head().unwrap();
    let commits_before = walk.count();

    engine.fetch(&mut alice_link, &cred).unwrap();
    let status = engine.status(&alice_link).unwrap();
    assert_eq!((status.commits_ahead, status.commits_behind), (0, 3));
    assert_eq!(SyncEngine::legal_action(&status, false), LegalAction::Pull);

    let outcome = engine.pull(&mut alice_link, &cred, Favor::Ours).unwrap();
    assert_eq!(outcome, MergeOutcome::FastForwarded);
    assert!(outcome.requires_reload());

    let mut walk = alice_link.repo.revwalk().unwrap();
    walk.push_head().unwrap();
    assert_eq!(walk.count(), commits_before + 3);
    assert_eq!(head(&alice), head(&bob));
    assert_eq!(
        fs::read_to_string(alice.join("slides.md")).unwrap(),
        "# one\n# two\n# three\n"
    );
    let tip = alice_link.repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(tip.parent_count(), 1);
    drop(tip);
    assert_eq!(engine.pending_sync_changes(&alice_link).unwrap(), (0, 0));

    // Nothing new on the remote
    assert_eq!(
        engine.pull(&mut alice_link, &cred, Favor::Ours).unwrap(),
        MergeOutcome::UpToDate
    );
}

#[test]
fn test_ahead_then_push() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let engine = engine();
    let cred = credential();
    let mut link = fixture.link(&alice);

    fs::write(alice.join("notes.md"), "draft\n").unwrap();
    assert_eq!(engine.pending_local_changes(&link).unwrap(), 1);
    let status = engine.status(&link).unwrap();
    assert_eq!(SyncEngine::legal_action(&status, false), LegalAction::Commit);

    let oid = engine.commit(&link, "add notes", &cred).unwrap();
    let commit = link.repo.find_commit(oid).unwrap();
    assert_eq!(commit.author().name(), Some("Octo Cat"));
    assert_eq!(commit.author().email(), Some("octo@example.com"));
    drop(commit);

    let status = engine.status(&link).unwrap();
    assert_eq!((status.pending_local_changes, status.commits_ahead), (0, 1));
    assert_eq!(SyncEngine::legal_action(&status, false), LegalAction::Push);

    fs::write(alice.join("notes.md"), "draft\nmore\n").unwrap();
    let oid = engine.commit(&link, "extend notes", &cred).unwrap();
    assert_eq!(engine.pending_sync_changes(&link).unwrap(), (2, 0));

    engine.push(&mut link, &cred).unwrap();
    assert_eq!(engine.pending_sync_changes(&link).unwrap(), (0, 0));

    let remote = Repository::open_bare(&fixture.remote_path).unwrap();
    let remote_main = remote.refname_to_id("refs/heads/main").unwrap();
    assert_eq!(remote_main, oid);
}

#[test]
fn test_push_rejected_when_remote_moved() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let bob = fixture.clone_as("bob");
    let engine = engine();
    let cred = credential();

    let mut bob_link = fixture.link(&bob);
    commit_file(&bob, "b.md", "bob\n", "bob");
    engine.push(&mut bob_link, &cred).unwrap();

    let mut alice_link = fixture.link(&alice);
    commit_file(&alice, "a.md", "alice\n", "alice");
    let err = engine.push(&mut alice_link, &cred).unwrap_err();
    assert!(matches!(err, SyncError::NonFastForward), "got {err:?}");

    engine.fetch(&mut alice_link, &cred).unwrap();
    let status = engine.status(&alice_link).unwrap();
    assert_eq!((status.commits_ahead, status.commits_behind), (1, 1));
    assert_eq!(SyncEngine::legal_action(&status, false), LegalAction::Sync);
}

#[test]
fn test_diverged_clean_merge_then_push() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let bob = fixture.clone_as("bob");
    let engine = engine();
    let cred = credential();

    let mut bob_link = fixture.link(&bob);
    let bob_commit = commit_file(&bob, "b.md", "bob\n", "bob");
    engine.push(&mut bob_link, &cred).unwrap();

    let mut alice_link = fixture.link(&alice);
    let alice_commit = commit_file(&alice, "a.md", "alice\n", "alice");

    let outcome = engine.pull(&mut alice_link, &cred, Favor::Ours).unwrap();
    assert_eq!(outcome, MergeOutcome::MergedClean);

    let merge = alice_link.repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(merge.parent_count(), 2);
    assert_eq!(merge.parent_id(0).unwrap(), alice_commit);
    assert_eq!(merge.parent_id(1).unwrap(), bob_commit);
    drop(merge);
    assert!(alice.join("a.md").exists());
    assert!(alice.join("b.md").exists());
    assert_eq!(engine.pending_local_changes(&alice_link).unwrap(), 0);
    assert_eq!(alice_link.repo.state(), git2::RepositoryState::Clean);

    let status = engine.status(&alice_link).unwrap();
    assert_eq!((status.commits_ahead, status.commits_behind), (2, 0));
    engine.push(&mut alice_link, &cred).unwrap();

    assert_eq!(
        engine.pull(&mut bob_link, &cred, Favor::Ours).unwrap(),
        MergeOutcome::FastForwarded
    );
    assert!(bob.join("a.md").exists());
}

fn conflicting_pull(favor: Favor) -> String {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let bob = fixture.clone_as("bob");
    let engine = engine();
    let cred = credential();

    let mut bob_link = fixture.link(&bob);
    commit_file(&bob, "other.md", "unrelated\n", "bob adds a file");
    commit_file(&bob, "README.md", "bob\n", "bob edits readme");
    engine.push(&mut bob_link, &cred).unwrap();
    let remote_tip = head(&bob);

    let mut alice_link = fixture.link(&alice);
    commit_file(&alice, "README.md", "alice\n", "alice edits readme");
    engine.fetch(&mut alice_link, &cred).unwrap();
    assert_eq!(engine.pending_sync_changes(&alice_link).unwrap(), (1, 2));

    let outcome = engine.pull(&mut alice_link, &cred, favor).unwrap();
    assert_eq!(outcome, MergeOutcome::MergedWithConflictsResolved(favor));
    assert_eq!(engine.pending_local_changes(&alice_link).unwrap(), 0);
    let merge = alice_link.repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(merge.parent_id(1).unwrap(), remote_tip);
    assert!(alice.join("other.md").exists());
    fs::read_to_string(alice.join("README.md")).unwrap()
}

#[test]
fn test_conflict_resolved_keeping_remote() {
    assert_eq!(conflicting_pull(Favor::Theirs), "bob\n");
}

#[test]
fn test_conflict_resolved_keeping_local() {
    assert_eq!(conflicting_pull(Favor::Ours), "alice\n");
}

#[test]
fn test_uncommitted_changes_block_pull() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let engine = engine();
    let link = fixture.link(&alice);

    fs::write(alice.join("README.md"), "edited\n").unwrap();
    let err = engine.ensure_clean(&link).unwrap_err();
    assert!(matches!(err, SyncError::UncommittedChanges(1)));
}

#[test]
fn test_commit_without_changes() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let link = fixture.link(&alice);

    let err = engine().commit(&link, "nothing", &credential()).unwrap_err();
    assert!(matches!(err, SyncError::NothingToCommit));
}

#[test]
fn test_refetch_respects_fetch_period() {
    let fixture = RemoteFixture::new();
    let alice = fixture.clone_as("alice");
    let engine = engine();
    let cred = credential();
    let mut link = fixture.link(&alice);

    assert!(engine.refetch(&mut link, &cred).unwrap());
    assert!(!engine.refetch(&mut link, &cred).unwrap());

    let eager = SyncEngine::new(Duration::ZERO);
    assert!(eager.refetch(&mut link, &cred).unwrap());
}

#[test]
fn test_remote_operations_need_a_remote() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = git2::RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(dir.path(), &opts).unwrap();
    commit_file(dir.path(), "README.md", "local only\n", "init");

    let mut link = git_sync_manager::operations::RepositoryLink::discover(&dir.path().join("README.md")).unwrap();
    assert!(!link.has_remote());
    let err = engine().push(&mut link, &credential()).unwrap_err();
    assert!(matches!(err, SyncError::NoRemote));
    assert_eq!(engine().pending_sync_changes(&link).unwrap(), (0, 0));
}
