// Repository Link
// Binds a working file to its repository, remote and GitHub repository handle

use git2::Repository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use super::credentials::Credential;
use super::error::{ApiError, SyncError};
use super::git::GitOps;
use super::github::{GithubApi, RemoteRepo};

/// The link is shared between the UI thread and background tasks
pub type SharedLink = Arc<Mutex<RepositoryLink>>;

/// A discovered repository and what is known about its remote
pub struct RepositoryLink {
    /// Working directory root
    pub local_path: PathBuf,
    pub repo: Repository,
    /// Git remote name, usually `origin`; empty without a remote
    pub git_remote: String,
    pub remote_url: String,
    /// Owner and repository name parsed from the remote URL
    pub remote_owner: String,
    pub remote_name: String,
    /// Provider handle, set once resolved with a valid credential
    pub remote: Option<RemoteRepo>,
    pub pages_url: Option<String>,
    pub last_fetch: Option<Instant>,
}

impl std::fmt::Debug for RepositoryLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryLink")
            .field("local_path", &self.local_path)
            .field("git_remote", &self.git_remote)
            .field("remote_owner", &self.remote_owner)
            .field("remote_name", &self.remote_name)
            .field("remote", &self.remote.as_ref().map(|r| &r.full_name))
            .field("pages_url", &self.pages_url)
            .finish()
    }
}

impl RepositoryLink {
    /// Find the repository containing `file_path`; `None` when there is none
    pub fn discover(file_path: &Path) -> Option<RepositoryLink> {
        let start = start_dir(file_path);
        let repo = match Repository::discover(&start) {
            Ok(repo) => repo,
            Err(e) => {
                debug!(path = %start.display(), error = %e, "no repository found");
                return None;
            }
        };
        let local_path = repo.workdir()?.to_path_buf();

        let (git_remote, remote_url) = GitOps::first_remote(&repo).unwrap_or_default();
        let (remote_owner, remote_name) = parse_remote_url(&remote_url).unwrap_or_default();

        info!(
            path = %local_path.display(),
            remote = %remote_url,
            "linked repository"
        );

        Some(RepositoryLink {
            local_path,
            repo,
            git_remote,
            remote_url,
            remote_owner,
            remote_name,
            remote: None,
            pages_url: None,
            last_fetch: None,
        })
    }

    pub fn into_shared(self) -> SharedLink {
        Arc::new(Mutex::new(self))
    }

    pub fn has_remote(&self) -> bool {
        !self.git_remote.is_empty() && !self.remote_owner.is_empty() && !self.remote_name.is_empty()
    }

    /// Guard for every operation that talks to the remote
    pub fn require_remote(&self) -> Result<(), SyncError> {
        if self.has_remote() {
            Ok(())
        } else {
            Err(SyncError::NoRemote)
        }
    }

    /// Look the remote up on GitHub and remember the handle and pages URL
    pub async fn resolve_remote(
        &mut self,
        api: &dyn GithubApi,
        credential: &Credential,
    ) -> Result<RemoteRepo, SyncError> {
        self.require_remote()?;
        let token = credential.access_token.as_str();
        let lookup_error = |source: ApiError| SyncError::RemoteLookup {
            owner: self.remote_owner.clone(),
            name: self.remote_name.clone(),
            source,
        };

        let remote = api
            .repository(token, &self.remote_owner, &self.remote_name)
            .await
            .map_err(lookup_error)?;
        let pages = api
            .pages(token, &self.remote_owner, &self.remote_name)
            .await
            .map_err(lookup_error)?;

        self.pages_url = pages.and_then(|site| site.html_url);
        self.remote = Some(remote.clone());
        Ok(remote)
    }

    /// Drop everything that was obtained with the credential
    pub fn forget_remote(&mut self) {
        self.remote = None;
        self.pages_url = None;
    }
}

/// Directory discovery starts from: the path itself if it is a directory,
/// else its parent
pub fn start_dir(file_path: &Path) -> PathBuf {
    if file_path.is_dir() {
        return file_path.to_path_buf();
    }
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `{owner, name}` from the last two path segments of a remote URL
///
/// Handles `https://host/owner/name(.git)`, `git@host:owner/name(.git)`,
/// `ssh://git@host/owner/name`, `file://` URLs and plain paths.
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let path = match Url::parse(url) {
        // A one-letter scheme is a Windows drive, not a URL
        Ok(parsed) if parsed.scheme().len() > 1 => parsed.path().to_string(),
        _ => match url.split_once(':') {
            Some((host, path))
                if host.contains('@') || (host.len() > 1 && !host.contains(['/', '\\'])) =>
            {
                path.to_string()
            }
            _ => url.to_string(),
        },
    };

    let trimmed = path.trim_end_matches(['/', '\\']);
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let mut segments = trimmed
        .rsplit(['/', '\\'])
        .filter(|segment| !segment.is_empty());
    let name = segments.next()?;
    let owner = segments.next()?;
    Some((owner.to_string(), name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(owner: &str, name: &str) -> Option<(String, String)> {
        Some((owner.to_string(), name.to_string()))
    }

    #[test]
    fn test_parse_https_urls() {
        assert_eq!(
            parse_remote_url("https://github.com/octocat/Hello-World.git"),
            pair("octocat", "Hello-World")
        );
        assert_eq!(
            parse_remote_url("https://github.com/octocat/Hello-World"),
            pair("octocat", "Hello-World")
        );
        assert_eq!(
            parse_remote_url("https://token@github.com/octocat/Hello-World/"),
            pair("octocat", "Hello-World")
        );
    }

    #[test]
    fn test_parse_ssh_urls() {
        assert_eq!(
            parse_remote_url("git@github.com:octocat/Hello-World.git"),
            pair("octocat", "Hello-World")
        );
        assert_eq!(
            parse_remote_url("ssh://git@github.com/octocat/Hello-World.git"),
            pair("octocat", "Hello-World")
        );
    }

    #[test]
    fn test_parse_local_paths() {
        assert_eq!(
            parse_remote_url("/srv/git/team/project.git"),
            pair("team", "project")
        );
        assert_eq!(
            parse_remote_url("file:///srv/git/team/project"),
            pair("team", "project")
        );
    }

    #[test]
    fn test_parse_rejects_short_urls() {
        assert_eq!(parse_remote_url(""), None);
        assert_eq!(parse_remote_url("https://github.com/"), None);
        assert_eq!(parse_remote_url("project.git"), None);
    }

    #[test]
    fn test_discover_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scene.txt");
        std::fs::write(&file, "x").unwrap();

        // tempdir may itself live inside a repository on some machines
        if Repository::discover(dir.path()).is_err() {
            assert!(RepositoryLink::discover(&file).is_none());
        }
    }

    #[test]
    fn test_discover_from_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "git@github.com:octocat/slides.git").unwrap();
        std::fs::create_dir_all(dir.path().join("assets/img")).unwrap();
        let file = dir.path().join("assets/img/logo.png");
        std::fs::write(&file, "png").unwrap();

        let link = RepositoryLink::discover(&file).unwrap();
        assert_eq!(
            link.local_path.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        assert_eq!(link.git_remote, "origin");
        assert_eq!(link.remote_owner, "octocat");
        assert_eq!(link.remote_name, "slides");
        assert!(link.require_remote().is_ok());
    }

    #[test]
    fn test_repository_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        let link = RepositoryLink::discover(dir.path()).unwrap();
        assert!(link.remote_owner.is_empty());
        assert!(matches!(link.require_remote(), Err(SyncError::NoRemote)));
    }
}
