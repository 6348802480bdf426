// Shared test fixtures: a bare remote on disk, working clones and an
// in-memory GitHub API
#![allow(dead_code)]

use async_trait::async_trait;
use git2::{Oid, Repository, RepositoryInitOptions, Signature};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use git_sync_manager::operations::github::{
    GenerateRequest, GithubApi, GithubEmail, GithubUser, PagesRequest, PagesSite, RemoteRepo,
    RepoOwner,
};
use git_sync_manager::operations::{ApiError, Credential, GitOps, RepositoryLink};

pub const OWNER: &str = "octo";
pub const REPO: &str = "deck";

/// A bare remote at `<root>/octo/deck.git` seeded with one commit on `main`
pub struct RemoteFixture {
    pub root: TempDir,
    pub remote_path: PathBuf,
}

impl RemoteFixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let remote_path = root.path().join(OWNER).join(format!("{REPO}.git"));
        fs::create_dir_all(&remote_path).unwrap();

        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head("main");
        Repository::init_opts(&remote_path, &opts).unwrap();

        let seed_dir = root.path().join("seed");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let seed = Repository::init_opts(&seed_dir, &opts).unwrap();
        seed.remote("origin", remote_path.to_str().unwrap()).unwrap();
        commit_file(&seed_dir, "README.md", "seed\n", "seed");
        GitOps::push(&seed, "origin", "main", "").unwrap();

        Self { root, remote_path }
    }

    pub fn url(&self) -> String {
        self.remote_path.to_str().unwrap().to_string()
    }

    /// Fresh working clone at `<root>/<name>`
    pub fn clone_as(&self, name: &str) -> PathBuf {
        let dir = self.root.path().join(name);
        Repository::clone(&self.url(), &dir).unwrap();
        dir
    }

    pub fn link(&self, dir: &Path) -> RepositoryLink {
        RepositoryLink::discover(&dir.join("README.md")).unwrap()
    }
}

pub fn signature() -> Signature<'static> {
    Signature::now("Fixture", "fixture@example.com").unwrap()
}

/// Write `file` in the working copy at `dir` and commit everything
pub fn commit_file(dir: &Path, file: &str, contents: &str, message: &str) -> Oid {
    let repo = Repository::open(dir).unwrap();
    fs::write(dir.join(file), contents).unwrap();
    GitOps::stage_all_and_commit(&repo, message, &signature()).unwrap()
}

pub fn head(dir: &Path) -> Oid {
    Repository::open(dir)
        .unwrap()
        .head()
        .unwrap()
        .target()
        .unwrap()
}

pub fn credential() -> Credential {
    Credential {
        access_token: "gho_test".to_string(),
        owner_login: OWNER.to_string(),
        owner_display_name: "Octo Cat".to_string(),
        owner_email: "octo@example.com".to_string(),
        owner_avatar_url: None,
    }
}

pub fn remote_repo(owner: &str, name: &str, clone_url: &str) -> RemoteRepo {
    RemoteRepo {
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        owner: RepoOwner {
            login: owner.to_string(),
        },
        clone_url: clone_url.to_string(),
        html_url: format!("https://github.com/{owner}/{name}"),
        default_branch: Some("main".to_string()),
        has_pages: false,
        private: false,
    }
}

/// In-memory GitHub: known repositories by `owner/name`, recorded requests
#[derive(Default)]
pub struct MockGithubClient {
    pub user: Mutex<Option<GithubUser>>,
    pub repos: Mutex<HashMap<String, RemoteRepo>>,
    pub pages: Mutex<HashMap<String, PagesSite>>,
    pub generated: Mutex<Vec<GenerateRequest>>,
    pub pages_requests: Mutex<Vec<PagesRequest>>,
    /// Clone URL handed out for generated repositories
    pub generated_clone_url: Mutex<String>,
}

impl MockGithubClient {
    pub fn with_user(login: &str) -> Self {
        let mock = Self::default();
        *mock.user.lock().unwrap() = Some(GithubUser {
            login: login.to_string(),
            name: Some("Octo Cat".to_string()),
            email: None,
            avatar_url: None,
        });
        mock
    }

    pub fn add_repo(&self, repo: RemoteRepo) {
        self.repos
            .lock()
            .unwrap()
            .insert(repo.full_name.clone(), repo);
    }
}

fn not_found(what: String) -> ApiError {
    ApiError::NotFound {
        context: what,
        body: r#"{"message":"Not Found"}"#.to_string(),
    }
}

#[async_trait]
impl GithubApi for MockGithubClient {
    async fn authenticated_user(&self, _token: &str) -> Result<GithubUser, ApiError> {
        self.user
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Status {
                context: "GET /user".to_string(),
                status: 401,
                body: "Bad credentials".to_string(),
            })
    }

    async fn user_emails(&self, _token: &str) -> Result<Vec<GithubEmail>, ApiError> {
        Ok(vec![GithubEmail {
            email: "octo@example.com".to_string(),
            primary: true,
            verified: true,
        }])
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        Err(not_found(url.to_string()))
    }

    async fn repository(&self, _token: &str, owner: &str, name: &str) -> Result<RemoteRepo, ApiError> {
        let key = format!("{owner}/{name}");
        self.repos
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(key))
    }

    async fn pages(&self, _token: &str, owner: &str, name: &str) -> Result<Option<PagesSite>, ApiError> {
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&format!("{owner}/{name}"))
            .cloned())
    }

    async fn generate_from_template(
        &self,
        _token: &str,
        template_owner: &str,
        template_name: &str,
        request: &GenerateRequest,
    ) -> Result<RemoteRepo, ApiError> {
        if !self
            .repos
            .lock()
            .unwrap()
            .contains_key(&format!("{template_owner}/{template_name}"))
        {
            return Err(ApiError::Status {
                context: "POST generate".to_string(),
                status: 404,
                body: "template not found".to_string(),
            });
        }
        self.generated.lock().unwrap().push(request.clone());
        let clone_url = self.generated_clone_url.lock().unwrap().clone();
        let repo = remote_repo(&request.owner, &request.name, &clone_url);
        self.add_repo(repo.clone());
        Ok(repo)
    }

    async fn enable_pages(
        &self,
        _token: &str,
        owner: &str,
        name: &str,
        request: &PagesRequest,
    ) -> Result<PagesSite, ApiError> {
        self.pages_requests.lock().unwrap().push(request.clone());
        let site = PagesSite {
            html_url: None,
            build_type: Some(request.build_type.clone()),
            source: Some(request.source.clone()),
        };
        self.pages
            .lock()
            .unwrap()
            .insert(format!("{owner}/{name}"), site.clone());
        Ok(site)
    }
}
