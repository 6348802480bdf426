// Operation Errors
// Typed failures for sync, registration, repository administration and the REST client

use git2::{ErrorClass, ErrorCode};
use std::path::PathBuf;
use thiserror::Error;

/// Failure talking to the GitHub REST API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} returned {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    #[error("{context} not found: {body}")]
    NotFound { context: String, body: String },
}

impl ApiError {
    /// Message the provider sent back, without our own framing
    pub fn provider_message(&self) -> String {
        match self {
            ApiError::Status { body, .. } | ApiError::NotFound { body, .. } if !body.is_empty() => {
                body.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Failure of a repository link or sync engine operation
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote rejected the credential: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("remote has commits that are not present locally; pull first")]
    NonFastForward,

    #[error("could not look up remote repository {owner}/{name}: {source}")]
    RemoteLookup {
        owner: String,
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("working tree has {0} uncommitted change(s); commit first")]
    UncommittedChanges(usize),

    #[error("not registered with GitHub")]
    NotRegistered,

    #[error("no repository is open")]
    NoRepository,

    #[error("repository has no usable remote")]
    NoRemote,

    #[error("branch '{0}' has no remote-tracking branch")]
    NoTrackingBranch(String),

    #[error("HEAD is detached")]
    DetachedHead,

    #[error("merge left unresolved conflicts in: {}", format_paths(.paths))]
    UnresolvedConflicts { paths: Vec<PathBuf> },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("background task failed: {0}")]
    Background(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl SyncError {
    /// Map a libgit2 error raised by a remote operation onto the sync taxonomy
    pub fn from_remote(err: git2::Error) -> Self {
        match (err.code(), err.class()) {
            (ErrorCode::Auth, _) | (ErrorCode::Certificate, _) => {
                SyncError::Auth(err.message().to_string())
            }
            (ErrorCode::NotFastForward, _) => SyncError::NonFastForward,
            (_, ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssl | ErrorClass::Ssh) => {
                SyncError::Network(err.message().to_string())
            }
            _ => SyncError::Git(err),
        }
    }

    /// The repository may be in a state the engine cannot reason about
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::UnresolvedConflicts { .. })
    }

    /// Repeating the same command later may succeed without user action
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_) => true,
            SyncError::Api(ApiError::Http(_)) => true,
            SyncError::RemoteLookup {
                source: ApiError::Http(_),
                ..
            } => true,
            SyncError::Git(err) => matches!(err.code(), ErrorCode::Locked),
            _ => false,
        }
    }
}

/// Failure in the OAuth registration flow
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("authorization callback failed: {0}")]
    Callback(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("callback listener I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("could not persist credential: {0}")]
    Store(String),
}

/// Failure creating, configuring or cloning a remote repository
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("could not create repository: {0}")]
    RemoteCreate(String),

    #[error("could not configure pages: {0}")]
    PagesConfig(String),

    #[error("clone failed: {0}")]
    Clone(#[from] git2::Error),

    #[error("target directory is not empty: {}", .0.display())]
    TargetNotEmpty(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_classification() {
        let auth = git2::Error::new(ErrorCode::Auth, ErrorClass::Http, "bad token");
        assert!(matches!(SyncError::from_remote(auth), SyncError::Auth(_)));

        let nff = git2::Error::new(
            ErrorCode::NotFastForward,
            ErrorClass::Reference,
            "cannot push non-fastforwardable reference",
        );
        assert!(matches!(SyncError::from_remote(nff), SyncError::NonFastForward));

        let net = git2::Error::new(ErrorCode::GenericError, ErrorClass::Net, "unreachable");
        let net = SyncError::from_remote(net);
        assert!(matches!(net, SyncError::Network(_)));
        assert!(net.is_retryable());
    }

    #[test]
    fn test_provider_message_is_the_response_body() {
        let missing = ApiError::NotFound {
            context: "POST /repos/org/deck/generate".to_string(),
            body: r#"{"message":"Not Found"}"#.to_string(),
        };
        assert_eq!(missing.provider_message(), r#"{"message":"Not Found"}"#);

        let empty = ApiError::NotFound {
            context: "GET /repos/octo/deck".to_string(),
            body: String::new(),
        };
        assert_eq!(empty.provider_message(), "GET /repos/octo/deck not found: ");
    }

    #[test]
    fn test_only_unresolved_conflicts_are_fatal() {
        let fatal = SyncError::UnresolvedConflicts {
            paths: vec![PathBuf::from("a.txt"), PathBuf::from("b/c.txt")],
        };
        assert!(fatal.is_fatal());
        assert!(fatal.to_string().contains("a.txt, b/c.txt"));

        assert!(!SyncError::NonFastForward.is_fatal());
        assert!(!SyncError::NothingToCommit.is_retryable());
    }
}
