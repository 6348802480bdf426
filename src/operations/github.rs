// GitHub API
// REST calls the registration flow, repository link and repository admin need

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use crate::constants::APP_NAME;
use crate::core::app_config::GithubSettings;

pub type SharedGithubApi = Arc<dyn GithubApi>;

/// Every provider call the core makes. The token is passed per call because
/// it changes when the user registers or deregisters.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// `GET /user`
    async fn authenticated_user(&self, token: &str) -> Result<GithubUser, ApiError>;

    /// `GET /user/emails`
    async fn user_emails(&self, token: &str) -> Result<Vec<GithubEmail>, ApiError>;

    /// Download raw bytes from an absolute URL (avatar images)
    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError>;

    /// `GET /repos/{owner}/{name}`
    async fn repository(&self, token: &str, owner: &str, name: &str)
        -> Result<RemoteRepo, ApiError>;

    /// `GET /repos/{owner}/{name}/pages`; `None` when pages are not enabled
    async fn pages(&self, token: &str, owner: &str, name: &str)
        -> Result<Option<PagesSite>, ApiError>;

    /// `POST /repos/{template_owner}/{template_name}/generate`
    async fn generate_from_template(
        &self,
        token: &str,
        template_owner: &str,
        template_name: &str,
        request: &GenerateRequest,
    ) -> Result<RemoteRepo, ApiError>;

    /// `POST /repos/{owner}/{name}/pages`
    async fn enable_pages(
        &self,
        token: &str,
        owner: &str,
        name: &str,
        request: &PagesRequest,
    ) -> Result<PagesSite, ApiError>;
}

#[derive(Clone, Debug, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GithubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

/// Provider-side handle of a repository
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RemoteRepo {
    pub name: String,
    pub full_name: String,
    pub owner: RepoOwner,
    pub clone_url: String,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub has_pages: bool,
    #[serde(default)]
    pub private: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagesSource {
    pub branch: String,
    pub path: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PagesSite {
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub source: Option<PagesSource>,
}

/// Body of the template generate call
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub owner: String,
    pub name: String,
    pub description: String,
    pub include_all_branches: bool,
    pub private: bool,
}

/// Body of the pages enable call
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PagesRequest {
    pub build_type: String,
    pub source: PagesSource,
}

/// GitHub client backed by reqwest
pub struct RealGithubClient {
    http_client: Client,
    base_url: String,
    api_version: String,
}

impl RealGithubClient {
    pub fn new(settings: &GithubSettings) -> Self {
        Self {
            http_client: Client::new(),
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http_client
            .request(method, self.url(path))
            .header("User-Agent", APP_NAME)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {token}"))
            .header("X-GitHub-Api-Version", &self.api_version)
    }

    /// Turn a non-success status into an error carrying the provider body
    async fn check(res: Response, context: &str) -> Result<Response, ApiError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                context: context.to_string(),
                body,
            });
        }
        Err(ApiError::Status {
            context: context.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        context: &str,
    ) -> Result<T, ApiError> {
        let res = self.request(Method::GET, path, token).send().await?;
        let res = Self::check(res, context).await?;
        Ok(res.json::<T>().await?)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        body: &B,
        context: &str,
    ) -> Result<T, ApiError> {
        let res = self
            .request(Method::POST, path, token)
            .json(body)
            .send()
            .await?;
        let res = Self::check(res, context).await?;
        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl GithubApi for RealGithubClient {
    async fn authenticated_user(&self, token: &str) -> Result<GithubUser, ApiError> {
        self.get_json("/user", token, "GET /user").await
    }

    async fn user_emails(&self, token: &str) -> Result<Vec<GithubEmail>, ApiError> {
        self.get_json("/user/emails", token, "GET /user/emails").await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let res = self
            .http_client
            .get(url)
            .header("User-Agent", APP_NAME)
            .send()
            .await?;
        let res = Self::check(res, url).await?;
        Ok(res.bytes().await?.to_vec())
    }

    async fn repository(
        &self,
        token: &str,
        owner: &str,
        name: &str,
    ) -> Result<RemoteRepo, ApiError> {
        let path = format!("/repos/{owner}/{name}");
        self.get_json(&path, token, &format!("GET {path}")).await
    }

    async fn pages(
        &self,
        token: &str,
        owner: &str,
        name: &str,
    ) -> Result<Option<PagesSite>, ApiError> {
        let path = format!("/repos/{owner}/{name}/pages");
        match self.get_json(&path, token, &format!("GET {path}")).await {
            Ok(site) => Ok(Some(site)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn generate_from_template(
        &self,
        token: &str,
        template_owner: &str,
        template_name: &str,
        request: &GenerateRequest,
    ) -> Result<RemoteRepo, ApiError> {
        let path = format!("/repos/{template_owner}/{template_name}/generate");
        self.post_json(&path, token, request, &format!("POST {path}"))
            .await
    }

    async fn enable_pages(
        &self,
        token: &str,
        owner: &str,
        name: &str,
        request: &PagesRequest,
    ) -> Result<PagesSite, ApiError> {
        let path = format!("/repos/{owner}/{name}/pages");
        match self
            .post_json(&path, token, request, &format!("POST {path}"))
            .await
        {
            // Already enabled: report the existing site
            Err(ApiError::Status { status: 409, .. }) => {
                debug!(repo = %format!("{owner}/{name}"), "pages already enabled");
                Ok(self.pages(token, owner, name).await?.unwrap_or_default())
            }
            other => other,
        }
    }
}
