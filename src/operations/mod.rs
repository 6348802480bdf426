// Operations module
// Git plumbing, the sync engine, OAuth registration and GitHub repository administration

pub mod admin;
pub mod credentials;
pub mod error;
pub mod git;
pub mod github;
pub mod link;
pub mod oauth;
pub mod sync;

pub use admin::{retry_after_delay, PresentationRepo, RemoteRepoAdmin, RetryPolicy};
pub use credentials::{Credential, CredentialStore, NO_EMAIL};
pub use error::{AdminError, ApiError, OAuthError, SyncError};
pub use git::GitOps;
pub use github::{GithubApi, RealGithubClient, RemoteRepo, SharedGithubApi};
pub use link::{parse_remote_url, RepositoryLink, SharedLink};
pub use oauth::{AuthorizationHandle, OAuthFlow, RegistrationState, TokenValidation};
pub use sync::{Favor, LegalAction, MergeOutcome, SyncEngine, SyncStatus};
