// Git Operations
// libgit2 plumbing for status, divergence, fetch, push, commit and clone

use git2::build::RepoBuilder;
use git2::{
    BranchType, Cred, ErrorClass, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions,
    RemoteCallbacks, Repository, Signature, Status, StatusOptions,
};
use std::path::Path;
use tracing::debug;

use super::error::SyncError;
use crate::constants::TOKEN_PASSWORD;

/// Git operations handler
pub struct GitOps;

impl GitOps {
    /// Name and URL of the remote to sync with: `origin` when present, else the first one
    pub fn first_remote(repo: &Repository) -> Option<(String, String)> {
        let names = repo.remotes().ok()?;
        let name = if names.iter().flatten().any(|n| n == "origin") {
            "origin".to_string()
        } else {
            names.iter().flatten().next()?.to_string()
        };
        let remote = repo.find_remote(&name).ok()?;
        let url = remote.url()?.to_string();
        Some((name, url))
    }

    /// Short name of the checked-out branch, unborn branches included
    pub fn current_branch(repo: &Repository) -> Result<String, SyncError> {
        let head = repo.find_reference("HEAD")?;
        match head.symbolic_target() {
            Some(target) => Ok(target
                .strip_prefix("refs/heads/")
                .unwrap_or(target)
                .to_string()),
            None => Err(SyncError::DetachedHead),
        }
    }

    /// Commit HEAD points at; `None` on an unborn branch
    pub fn head_oid(repo: &Repository) -> Result<Option<Oid>, git2::Error> {
        match repo.head() {
            Ok(head) => Ok(head.target()),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// One entry per changed path: untracked, worktree and staged changes; ignored excluded
    pub fn count_changes(repo: &Repository) -> Result<usize, git2::Error> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .include_unmodified(false)
            .exclude_submodules(true);

        let statuses = repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter(|entry| {
                let status = entry.status();
                status != Status::CURRENT && !status.is_ignored()
            })
            .count())
    }

    /// Commit the branch is compared against: the configured upstream, else
    /// `refs/remotes/<remote>/<branch>`, else `refs/remotes/<remote>/HEAD`
    pub fn tracking_oid(repo: &Repository, remote_name: &str, branch: &str) -> Option<Oid> {
        if let Ok(local) = repo.find_branch(branch, BranchType::Local) {
            if let Ok(upstream) = local.upstream() {
                if let Some(oid) = upstream.get().target() {
                    return Some(oid);
                }
            }
        }

        if let Ok(oid) = repo.refname_to_id(&format!("refs/remotes/{remote_name}/{branch}")) {
            return Some(oid);
        }

        repo.find_reference(&format!("refs/remotes/{remote_name}/HEAD"))
            .ok()
            .and_then(|r| r.resolve().ok())
            .and_then(|r| r.target())
    }

    /// Commits reachable from `oid`, for an unborn local branch
    pub fn count_reachable(repo: &Repository, oid: Oid) -> Result<usize, git2::Error> {
        let mut walk = repo.revwalk()?;
        walk.push(oid)?;
        Ok(walk.count())
    }

    /// Credential callbacks answering with the access token; a second
    /// request means the token was rejected
    pub fn remote_callbacks<'a>(token: &str) -> RemoteCallbacks<'a> {
        let token = token.to_string();
        let mut attempts = 0u32;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, _username, allowed| {
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Http,
                    "access token was rejected by the remote",
                ));
            }
            if allowed.is_user_pass_plaintext() {
                Cred::userpass_plaintext(&token, TOKEN_PASSWORD)
            } else {
                Cred::default()
            }
        });
        callbacks
    }

    /// Fetch the remote's configured refspecs
    pub fn fetch(repo: &Repository, remote_name: &str, token: &str) -> Result<(), SyncError> {
        let mut remote = repo.find_remote(remote_name)?;
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(Self::remote_callbacks(token));
        remote
            .fetch(&[] as &[&str], Some(&mut opts), None)
            .map_err(SyncError::from_remote)?;
        Ok(())
    }

    /// Push `refs/heads/<branch>` to the same name, then advance the tracking ref
    pub fn push(
        repo: &Repository,
        remote_name: &str,
        branch: &str,
        token: &str,
    ) -> Result<(), SyncError> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut rejection: Option<String> = None;

        {
            let mut remote = repo.find_remote(remote_name)?;
            let mut callbacks = Self::remote_callbacks(token);
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejection = Some(format!("{refname}: {message}"));
                }
                Ok(())
            });
            let mut opts = PushOptions::new();
            opts.remote_callbacks(callbacks);
            remote
                .push(&[refspec.as_str()], Some(&mut opts))
                .map_err(SyncError::from_remote)?;
        }

        if let Some(message) = rejection {
            debug!(%message, "push rejected by remote");
            return Err(SyncError::NonFastForward);
        }

        if let Some(head) = Self::head_oid(repo)? {
            repo.reference(
                &format!("refs/remotes/{remote_name}/{branch}"),
                head,
                true,
                "push: update remote-tracking branch",
            )?;
        }
        Ok(())
    }

    /// Stage everything (deletions included) and commit on the current branch
    pub fn stage_all_and_commit(
        repo: &Repository,
        message: &str,
        signature: &Signature<'_>,
    ) -> Result<Oid, SyncError> {
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = match Self::head_oid(repo)? {
            Some(oid) => Some(repo.find_commit(oid)?),
            None => None,
        };

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(SyncError::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), signature, signature, message, &tree, &parents)?;
        Ok(oid)
    }

    /// Clone `url` into `dir` using token credentials
    pub fn clone(url: &str, dir: &Path, token: &str) -> Result<Repository, git2::Error> {
        let mut opts = FetchOptions::new();
        opts.remote_callbacks(Self::remote_callbacks(token));
        RepoBuilder::new().fetch_options(opts).clone(url, dir)
    }
}
