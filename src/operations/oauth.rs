// OAuth Flow
// Browser-based registration: authorization URL, one-shot callback listener,
// code exchange and token validation

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::credentials::{Credential, CredentialStore, NO_EMAIL};
use super::error::{ApiError, OAuthError};
use super::github::{GithubEmail, SharedGithubApi};
use crate::constants::APP_NAME;
use crate::core::app_config::OAuthSettings;

const CONFIRMATION_PAGE: &str = "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>git-sync-manager</title></head>\
<body style=\"font-family: sans-serif; text-align: center; margin-top: 4em\">\
<h1>Registration received</h1>\
<p>git-sync-manager is finishing the registration. You can close this tab.</p>\
</body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>git-sync-manager</title></head>\
<body style=\"font-family: sans-serif; text-align: center; margin-top: 4em\">\
<h1>Registration failed</h1>\
<p>GitHub did not send an authorization code. Start the registration again.</p>\
</body></html>";

/// Where the registration currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    NoCredential,
    AwaitingBrowserRedirect,
    AwaitingCallback,
    ExchangingToken,
    ValidatingToken,
    Registered,
}

impl RegistrationState {
    /// Next state on success; `Registered` stays put
    pub fn advance(self) -> Self {
        match self {
            RegistrationState::NoCredential => RegistrationState::AwaitingBrowserRedirect,
            RegistrationState::AwaitingBrowserRedirect => RegistrationState::AwaitingCallback,
            RegistrationState::AwaitingCallback => RegistrationState::ExchangingToken,
            RegistrationState::ExchangingToken => RegistrationState::ValidatingToken,
            RegistrationState::ValidatingToken => RegistrationState::Registered,
            RegistrationState::Registered => RegistrationState::Registered,
        }
    }

    pub fn is_busy(self) -> bool {
        !matches!(
            self,
            RegistrationState::NoCredential | RegistrationState::Registered
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            RegistrationState::NoCredential => "not registered",
            RegistrationState::AwaitingBrowserRedirect => "opening browser",
            RegistrationState::AwaitingCallback => "waiting for GitHub authorization",
            RegistrationState::ExchangingToken => "requesting access token",
            RegistrationState::ValidatingToken => "validating access token",
            RegistrationState::Registered => "registered",
        }
    }
}

/// Everything the callback step needs from the authorization step
#[derive(Debug, Clone)]
pub struct AuthorizationHandle {
    pub url: Url,
    /// CSRF value echoed back by the provider
    pub state: String,
    pub callback_host: String,
    pub callback_port: u16,
}

#[derive(Debug)]
pub enum TokenValidation {
    Valid(Credential),
    Invalid,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth web flow against GitHub
pub struct OAuthFlow {
    settings: OAuthSettings,
    http: Client,
    api: SharedGithubApi,
    avatar_dir: Option<PathBuf>,
}

impl OAuthFlow {
    pub fn new(settings: OAuthSettings, api: SharedGithubApi) -> Self {
        Self {
            settings,
            http: Client::new(),
            api,
            avatar_dir: None,
        }
    }

    /// Download avatars into `dir` after a successful exchange
    pub fn with_avatar_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.avatar_dir = Some(dir.into());
        self
    }

    /// Build the authorization URL with a fresh CSRF state
    pub fn begin_authorization(&self) -> Result<AuthorizationHandle, OAuthError> {
        let state = Uuid::new_v4().simple().to_string();
        let mut url = Url::parse(&self.settings.authorization_base_url).map_err(|e| {
            OAuthError::Callback(format!(
                "invalid authorization URL {}: {e}",
                self.settings.authorization_base_url
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("scope", &self.settings.scopes.join(","))
            .append_pair("state", &state);

        Ok(AuthorizationHandle {
            url,
            state,
            callback_host: self.settings.callback_host.clone(),
            callback_port: self.settings.callback_port,
        })
    }

    /// Listen for the provider's redirect and return the authorization code
    pub async fn await_callback(&self, handle: &AuthorizationHandle) -> Result<String, OAuthError> {
        let listener = CallbackListener::bind(&handle.callback_host, handle.callback_port).await?;
        info!(addr = ?listener.local_addr().ok(), "waiting for OAuth callback");
        listener.accept_code(Some(&handle.state)).await
    }

    /// Trade the code for an access token and look up who it belongs to
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, OAuthError> {
        if self.settings.client_secret.is_empty() {
            return Err(OAuthError::TokenExchange(
                "no OAuth client secret configured".to_string(),
            ));
        }

        let res = self
            .http
            .post(&self.settings.token_url)
            .header("Accept", "application/json")
            .header("User-Agent", APP_NAME)
            .form(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;
        if !status.is_success() {
            return Err(OAuthError::TokenExchange(format!("{status}: {body}")));
        }

        let token = parse_token_response(&body)?;
        let credential = self.fetch_identity(&token).await?;
        if let Some(path) = self.cache_avatar(&credential).await {
            debug!(path = %path.display(), "avatar cached");
        }
        info!(login = %credential.owner_login, "access token obtained");
        Ok(credential)
    }

    /// Ask the provider who the token belongs to; any failure means invalid
    pub async fn validate_token(&self, token: &str) -> TokenValidation {
        match self.fetch_identity(token).await {
            Ok(credential) => TokenValidation::Valid(credential),
            Err(e) => {
                warn!(error = %e, "stored access token is no longer valid");
                TokenValidation::Invalid
            }
        }
    }

    /// Forget the credential and return the page where the user can revoke
    /// the application's access
    pub fn revoke_local(&self, store: &mut CredentialStore) -> Result<String, OAuthError> {
        store
            .clear()
            .map_err(|e| OAuthError::Store(format!("{e:#}")))?;
        Ok(self.revocation_url())
    }

    pub fn revocation_url(&self) -> String {
        format!(
            "{}/{}",
            self.settings.apps_settings_url.trim_end_matches('/'),
            self.settings.client_id
        )
    }

    async fn fetch_identity(&self, token: &str) -> Result<Credential, ApiError> {
        let user = self.api.authenticated_user(token).await?;
        let owner_email = match self.api.user_emails(token).await {
            Ok(emails) => primary_email(&emails),
            Err(e) => {
                warn!(error = %e, "could not list account emails");
                user.email
                    .clone()
                    .filter(|email| !email.is_empty())
                    .unwrap_or_else(|| NO_EMAIL.to_string())
            }
        };
        let owner_display_name = user
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user.login.clone());

        Ok(Credential {
            access_token: token.to_string(),
            owner_login: user.login,
            owner_display_name,
            owner_email,
            owner_avatar_url: user.avatar_url,
        })
    }

    /// Best effort; failures are logged and ignored
    async fn cache_avatar(&self, credential: &Credential) -> Option<PathBuf> {
        let dir = self.avatar_dir.as_ref()?;
        let url = credential.owner_avatar_url.as_ref()?;

        let bytes = match self.api.download(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "avatar download failed");
                return None;
            }
        };
        let path = dir.join(format!("{}.png", credential.owner_login));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &bytes).await
        };
        match written.await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(error = %e, "could not store avatar");
                None
            }
        }
    }
}

/// Pick the primary address, falling back to the sentinel
pub fn primary_email(emails: &[GithubEmail]) -> String {
    emails
        .iter()
        .find(|e| e.primary)
        .map(|e| e.email.clone())
        .unwrap_or_else(|| NO_EMAIL.to_string())
}

/// Extract the access token from the token endpoint's body. The endpoint
/// answers 200 with an `error` field when the code is rejected.
pub fn parse_token_response(body: &str) -> Result<String, OAuthError> {
    let response = match serde_json::from_str::<TokenResponse>(body) {
        Ok(response) => response,
        Err(_) => {
            let fields: HashMap<String, String> =
                url::form_urlencoded::parse(body.as_bytes()).into_owned().collect();
            TokenResponse {
                access_token: fields.get("access_token").cloned(),
                error: fields.get("error").cloned(),
                error_description: fields.get("error_description").cloned(),
            }
        }
    };

    if let Some(error) = response.error {
        let detail = response.error_description.unwrap_or_default();
        return Err(OAuthError::TokenExchange(
            format!("{error} {detail}").trim().to_string(),
        ));
    }
    response
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| OAuthError::TokenExchange("response carried no access token".to_string()))
}

/// Validate the redirect target and pull the authorization code out of it
pub fn extract_code(target: &str, expected_state: Option<&str>) -> Result<String, OAuthError> {
    let url = Url::parse("http://localhost/")
        .and_then(|base| base.join(target))
        .map_err(|e| OAuthError::Callback(format!("malformed callback target {target}: {e}")))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        let detail = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or_default();
        return Err(OAuthError::Callback(format!("{error} {detail}").trim().to_string()));
    }

    if let Some(expected) = expected_state {
        if params.get("state").map(String::as_str) != Some(expected) {
            return Err(OAuthError::Callback("state parameter mismatch".to_string()));
        }
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or_else(|| OAuthError::Callback("request carried no code parameter".to_string()))
}

/// Local HTTP listener that answers exactly one request
pub struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    pub async fn bind(host: &str, port: u16) -> Result<Self, OAuthError> {
        let listener = TcpListener::bind((host, port)).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one request, answer it and close the listener
    pub async fn accept_code(self, expected_state: Option<&str>) -> Result<String, OAuthError> {
        let (mut stream, peer) = self.listener.accept().await?;
        debug!(%peer, "callback connection");

        let result = match read_request_target(&mut stream).await {
            Ok(target) => extract_code(&target, expected_state),
            Err(e) => Err(e),
        };

        let (status, page) = match &result {
            Ok(_) => ("200 OK", CONFIRMATION_PAGE),
            Err(_) => ("400 Bad Request", FAILURE_PAGE),
        };
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{page}",
            page.len()
        );
        stream.write_all(response.as_bytes()).await?;
        if let Err(e) = stream.shutdown().await {
            debug!(error = %e, "callback connection shutdown");
        }

        result
    }
}

async fn read_request_target(stream: &mut TcpStream) -> Result<String, OAuthError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Skip headers up to the blank line
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 || line.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(_method), Some(target)) => Ok(target.to_string()),
        _ => Err(OAuthError::Callback(format!(
            "malformed request line: {}",
            request_line.trim()
        ))),
    }
}
