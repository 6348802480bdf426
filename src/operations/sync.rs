// Sync Engine
// Divergence tracking, commit, fetch, push and pull between a working copy and its remote

use git2::build::CheckoutBuilder;
use git2::{FileFavor, Index, MergeOptions, Oid, Repository};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::credentials::Credential;
use super::error::SyncError;
use super::git::GitOps;
use super::link::RepositoryLink;

/// Which side wins a conflicting hunk during a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Favor {
    Theirs,
    Ours,
}

impl Favor {
    pub fn from_keep_theirs(keep_theirs: bool) -> Self {
        if keep_theirs {
            Favor::Theirs
        } else {
            Favor::Ours
        }
    }

    fn file_favor(self) -> FileFavor {
        match self {
            Favor::Theirs => FileFavor::Theirs,
            Favor::Ours => FileFavor::Ours,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Favor::Theirs => "remote",
            Favor::Ours => "local",
        }
    }
}

/// Result of a pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    UpToDate,
    FastForwarded,
    MergedClean,
    MergedWithConflictsResolved(Favor),
}

impl MergeOutcome {
    /// Files on disk changed and open documents must be reloaded
    pub fn requires_reload(&self) -> bool {
        !matches!(self, MergeOutcome::UpToDate)
    }

    pub fn describe(&self) -> String {
        match self {
            MergeOutcome::UpToDate => "already up to date".to_string(),
            MergeOutcome::FastForwarded => "fast-forwarded to remote".to_string(),
            MergeOutcome::MergedClean => "merged remote changes".to_string(),
            MergeOutcome::MergedWithConflictsResolved(favor) => {
                format!("merged remote changes, conflicts resolved in favor of {}", favor.label())
            }
        }
    }
}

/// Snapshot of how far the working copy is from its remote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub pending_local_changes: usize,
    pub commits_ahead: usize,
    pub commits_behind: usize,
}

/// The single sync action that makes sense right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalAction {
    None,
    Commit,
    Push,
    Pull,
    /// Diverged: merge the remote in, then push
    Sync,
}

impl LegalAction {
    pub fn label(&self) -> &'static str {
        match self {
            LegalAction::None => "nothing to do",
            LegalAction::Commit => "commit",
            LegalAction::Push => "push",
            LegalAction::Pull => "pull",
            LegalAction::Sync => "sync (merge + push)",
        }
    }
}

/// Engine for repository synchronization
///
/// Every method expects the caller to hold the link's mutex, so operations
/// on one link never interleave.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    fetch_period: Duration,
}

impl SyncEngine {
    /// Create an engine that fetches at most once per `fetch_period`
    pub fn new(fetch_period: Duration) -> Self {
        Self { fetch_period }
    }

    pub fn fetch_period(&self) -> Duration {
        self.fetch_period
    }

    /// Decide the currently valid action from a status snapshot
    pub fn legal_action(status: &SyncStatus, host_dirty: bool) -> LegalAction {
        if status.pending_local_changes > 0 || host_dirty {
            return LegalAction::Commit;
        }
        match (status.commits_ahead > 0, status.commits_behind > 0) {
            (true, false) => LegalAction::Push,
            (false, true) => LegalAction::Pull,
            (true, true) => LegalAction::Sync,
            (false, false) => LegalAction::None,
        }
    }

    /// Number of changed paths in the working tree and index
    pub fn pending_local_changes(&self, link: &RepositoryLink) -> Result<usize, SyncError> {
        Ok(GitOps::count_changes(&link.repo)?)
    }

    /// Fail with `UncommittedChanges` unless the working tree is clean
    pub fn ensure_clean(&self, link: &RepositoryLink) -> Result<(), SyncError> {
        match self.pending_local_changes(link)? {
            0 => Ok(()),
            n => Err(SyncError::UncommittedChanges(n)),
        }
    }

    /// `(ahead, behind)` relative to the tracking branch; `(0, 0)` without one
    pub fn pending_sync_changes(&self, link: &RepositoryLink) -> Result<(usize, usize), SyncError> {
        let repo = &link.repo;
        let branch = GitOps::current_branch(repo)?;
        let Some(remote_oid) = GitOps::tracking_oid(repo, &link.git_remote, &branch) else {
            return Ok((0, 0));
        };

        match GitOps::head_oid(repo)? {
            Some(local_oid) => Ok(repo.graph_ahead_behind(local_oid, remote_oid)?),
            None => Ok((0, GitOps::count_reachable(repo, remote_oid)?)),
        }
    }

    pub fn status(&self, link: &RepositoryLink) -> Result<SyncStatus, SyncError> {
        let pending_local_changes = self.pending_local_changes(link)?;
        let (commits_ahead, commits_behind) = self.pending_sync_changes(link)?;
        Ok(SyncStatus {
            pending_local_changes,
            commits_ahead,
            commits_behind,
        })
    }

    /// Fetch the remote into the remote-tracking refs
    pub fn fetch(&self, link: &mut RepositoryLink, credential: &Credential) -> Result<(), SyncError> {
        link.require_remote()?;
        GitOps::fetch(&link.repo, &link.git_remote, &credential.access_token)?;
        link.last_fetch = Some(Instant::now());
        info!(remote = %link.git_remote, path = %link.local_path.display(), "fetched");
        Ok(())
    }

    /// Fetch unless the last attempt is younger than the fetch period.
    /// Returns whether a fetch was performed.
    pub fn refetch(&self, link: &mut RepositoryLink, credential: &Credential) -> Result<bool, SyncError> {
        if let Some(last) = link.last_fetch {
            if last.elapsed() < self.fetch_period {
                debug!(elapsed = ?last.elapsed(), "skipping refetch");
                return Ok(false);
            }
        }

        match self.fetch(link, credential) {
            Ok(()) => Ok(true),
            Err(e) => {
                // Failed attempts are throttled as well
                link.last_fetch = Some(Instant::now());
                Err(e)
            }
        }
    }

    /// Stage every change and commit it with the credential's identity
    pub fn commit(
        &self,
        link: &RepositoryLink,
        message: &str,
        credential: &Credential,
    ) -> Result<Oid, SyncError> {
        // Refuse to commit onto a detached HEAD
        GitOps::current_branch(&link.repo)?;
        let signature = credential.signature()?;
        let oid = GitOps::stage_all_and_commit(&link.repo, message, &signature)?;
        info!(%oid, "committed");
        Ok(oid)
    }

    /// Push the current branch to the same name on the remote
    pub fn push(&self, link: &mut RepositoryLink, credential: &Credential) -> Result<(), SyncError> {
        link.require_remote()?;
        let branch = GitOps::current_branch(&link.repo)?;
        GitOps::push(&link.repo, &link.git_remote, &branch, &credential.access_token)?;
        info!(remote = %link.git_remote, %branch, "pushed");
        Ok(())
    }

    /// Fetch, then fast-forward or merge the remote branch into the current one
    pub fn pull(
        &self,
        link: &mut RepositoryLink,
        credential: &Credential,
        favor: Favor,
    ) -> Result<MergeOutcome, SyncError> {
        self.fetch(link, credential)?;

        let repo = &link.repo;
        let branch = GitOps::current_branch(repo)?;
        let remote_oid = GitOps::tracking_oid(repo, &link.git_remote, &branch)
            .ok_or_else(|| SyncError::NoTrackingBranch(branch.clone()))?;

        let annotated = repo.find_annotated_commit(remote_oid)?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;

        let outcome = if analysis.is_up_to_date() {
            MergeOutcome::UpToDate
        } else if analysis.is_fast_forward() || analysis.is_unborn() {
            fast_forward(repo, &branch, remote_oid)?;
            MergeOutcome::FastForwarded
        } else {
            merge(repo, credential, &link.git_remote, &branch, remote_oid, favor)?
        };

        info!(%branch, ?outcome, "pulled");
        Ok(outcome)
    }
}

/// Move the branch to `target` after checking out its tree without
/// touching uncommitted work
fn fast_forward(repo: &Repository, branch: &str, target: Oid) -> Result<(), SyncError> {
    let commit = repo.find_commit(target)?;
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;

    let refname = format!("refs/heads/{branch}");
    match repo.find_reference(&refname) {
        Ok(mut reference) => {
            reference.set_target(target, "pull: fast-forward")?;
        }
        Err(_) => {
            repo.reference(&refname, target, true, "pull: fast-forward")?;
        }
    }
    repo.set_head(&refname)?;
    Ok(())
}

/// Three-way merge in memory. The favor is only applied when the plain
/// merge conflicts; anything it cannot settle leaves the repository as it was.
fn merge(
    repo: &Repository,
    credential: &Credential,
    remote_name: &str,
    branch: &str,
    remote_oid: Oid,
    favor: Favor,
) -> Result<MergeOutcome, SyncError> {
    let local = repo.head()?.peel_to_commit()?;
    let remote = repo.find_commit(remote_oid)?;

    let plain = repo.merge_commits(&local, &remote, None)?;
    let (mut index, outcome) = if plain.has_conflicts() {
        let mut opts = MergeOptions::new();
        opts.file_favor(favor.file_favor());
        let favored = repo.merge_commits(&local, &remote, Some(&opts))?;
        if favored.has_conflicts() {
            let paths = conflict_paths(&favored)?;
            error!(?paths, ?favor, "merge left conflicts the favor could not resolve");
            return Err(SyncError::UnresolvedConflicts { paths });
        }
        (favored, MergeOutcome::MergedWithConflictsResolved(favor))
    } else {
        (plain, MergeOutcome::MergedClean)
    };

    let tree_id = index.write_tree_to(repo)?;
    let tree = repo.find_tree(tree_id)?;
    let signature = match repo.signature() {
        Ok(signature) => signature,
        Err(_) => credential.signature()?,
    };
    let message = format!("Merge remote-tracking branch '{remote_name}/{branch}'");
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &message,
        &tree,
        &[&local, &remote],
    )?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))?;
    repo.cleanup_state()?;
    Ok(outcome)
}

fn conflict_paths(index: &Index) -> Result<Vec<PathBuf>, git2::Error> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.push(PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned()));
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(pending: usize, ahead: usize, behind: usize) -> SyncStatus {
        SyncStatus {
            pending_local_changes: pending,
            commits_ahead: ahead,
            commits_behind: behind,
        }
    }

    #[test]
    fn test_legal_action_truth_table() {
        assert_eq!(SyncEngine::legal_action(&status(0, 0, 0), false), LegalAction::None);
        assert_eq!(SyncEngine::legal_action(&status(3, 0, 0), false), LegalAction::Commit);
        assert_eq!(SyncEngine::legal_action(&status(0, 0, 0), true), LegalAction::Commit);
        assert_eq!(SyncEngine::legal_action(&status(0, 2, 0), false), LegalAction::Push);
        assert_eq!(SyncEngine::legal_action(&status(0, 0, 1), false), LegalAction::Pull);
        assert_eq!(SyncEngine::legal_action(&status(0, 1, 2), false), LegalAction::Sync);
    }

    #[test]
    fn test_local_changes_take_precedence() {
        assert_eq!(SyncEngine::legal_action(&status(1, 4, 4), false), LegalAction::Commit);
    }

    #[test]
    fn test_only_up_to_date_skips_reload() {
        assert!(!MergeOutcome::UpToDate.requires_reload());
        assert!(MergeOutcome::FastForwarded.requires_reload());
        assert!(MergeOutcome::MergedClean.requires_reload());
        assert!(MergeOutcome::MergedWithConflictsResolved(Favor::Ours).requires_reload());
    }

    #[test]
    fn test_favor_from_flag() {
        assert_eq!(Favor::from_keep_theirs(true), Favor::Theirs);
        assert_eq!(Favor::from_keep_theirs(false), Favor::Ours);
    }
}
