// Remote Repository Admin
// Creates repositories from a template, enables pages and clones them

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::credentials::Credential;
use super::error::AdminError;
use super::git::GitOps;
use super::github::{GenerateRequest, PagesRequest, PagesSource, RemoteRepo, SharedGithubApi};
use crate::core::app_config::{GithubSettings, SyncSettings};

/// Fixed-delay retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            attempts: settings.clone_retry_attempts,
            delay: settings.clone_retry_delay,
        }
    }
}

/// Run `op` until it succeeds or the attempts are used up, sleeping between
/// attempts. Blocks the calling thread.
pub fn retry_after_delay<T, E: Display>(
    policy: &RetryPolicy,
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, E> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, delay = ?policy.delay, "attempt failed, retrying");
                std::thread::sleep(policy.delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// A freshly created presentation repository, ready to be linked
#[derive(Debug, Clone)]
pub struct PresentationRepo {
    pub remote: RemoteRepo,
    pub pages_url: String,
    pub local_dir: PathBuf,
}

pub struct RemoteRepoAdmin {
    api: SharedGithubApi,
    settings: GithubSettings,
    retry: RetryPolicy,
}

impl RemoteRepoAdmin {
    pub fn new(api: SharedGithubApi, settings: GithubSettings, retry: RetryPolicy) -> Self {
        Self {
            api,
            settings,
            retry,
        }
    }

    /// Generate `owner_login/new_name` from a template repository
    pub async fn create_from_template(
        &self,
        owner_login: &str,
        new_name: &str,
        template_owner: &str,
        template_name: &str,
        credential: &Credential,
    ) -> Result<RemoteRepo, AdminError> {
        let request = GenerateRequest {
            owner: owner_login.to_string(),
            name: new_name.to_string(),
            description: format!("Created from {template_owner}/{template_name}"),
            include_all_branches: false,
            private: false,
        };
        let remote = self
            .api
            .generate_from_template(
                &credential.access_token,
                template_owner,
                template_name,
                &request,
            )
            .await
            .map_err(|e| AdminError::RemoteCreate(e.provider_message()))?;

        info!(repo = %remote.full_name, "repository created from template");
        Ok(remote)
    }

    /// Turn on the workflow pages build and return the site URL
    pub async fn enable_static_pages(
        &self,
        owner_login: &str,
        repo_name: &str,
        credential: &Credential,
    ) -> Result<String, AdminError> {
        let request = PagesRequest {
            build_type: "workflow".to_string(),
            source: PagesSource {
                branch: self.settings.pages_branch.clone(),
                path: self.settings.pages_path.clone(),
            },
        };
        let site = self
            .api
            .enable_pages(&credential.access_token, owner_login, repo_name, &request)
            .await
            .map_err(|e| AdminError::PagesConfig(e.provider_message()))?;

        let url = site
            .html_url
            .unwrap_or_else(|| format!("https://{owner_login}.github.io/{repo_name}/"));
        info!(%url, "pages enabled");
        Ok(url)
    }

    /// Clone into an empty or missing directory, retrying once the provider
    /// has finished creating the repository. Blocks the calling thread.
    pub fn clone_remote(
        &self,
        remote: &RemoteRepo,
        local_dir: &Path,
        credential: &Credential,
    ) -> Result<PathBuf, AdminError> {
        clone_with_retry(
            &remote.clone_url,
            local_dir,
            &credential.access_token,
            &self.retry,
        )
    }

    /// Template repository, pages and local clone in one go
    pub async fn setup_presentation(
        &self,
        new_name: &str,
        local_dir: &Path,
        credential: &Credential,
    ) -> Result<PresentationRepo, AdminError> {
        ensure_empty_target(local_dir)?;

        let remote = self
            .create_from_template(
                &credential.owner_login,
                new_name,
                &self.settings.template_owner,
                &self.settings.template_name,
                credential,
            )
            .await?;
        let pages_url = self
            .enable_static_pages(&remote.owner.login, &remote.name, credential)
            .await?;

        let url = remote.clone_url.clone();
        let dir = local_dir.to_path_buf();
        let token = credential.access_token.clone();
        let retry = self.retry.clone();
        let local_dir = tokio::task::spawn_blocking(move || {
            clone_with_retry(&url, &dir, &token, &retry)
        })
        .await
        .map_err(|e| AdminError::Io(std::io::Error::other(e)))??;

        Ok(PresentationRepo {
            remote,
            pages_url,
            local_dir,
        })
    }
}

fn clone_with_retry(
    url: &str,
    local_dir: &Path,
    token: &str,
    retry: &RetryPolicy,
) -> Result<PathBuf, AdminError> {
    ensure_empty_target(local_dir)?;
    retry_after_delay(retry, |attempt| {
        info!(%url, attempt, "cloning");
        GitOps::clone(url, local_dir, token)
    })?;
    Ok(local_dir.to_path_buf())
}

/// A clone target must be missing or an empty directory
pub fn ensure_empty_target(dir: &Path) -> Result<(), AdminError> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() || fs::read_dir(dir)?.next().is_some() {
        return Err(AdminError::TargetNotEmpty(dir.to_path_buf()));
    }
    Ok(())
}
