// Credential Store
// Persists the single GitHub access token and the identity it belongs to

use anyhow::{Context, Result};
use git2::Signature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Stored in `owner_email` when the account exposes no primary email
pub const NO_EMAIL: &str = "no email";

/// Access token plus the authenticated identity
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub owner_login: String,
    pub owner_display_name: String,
    pub owner_email: String,
    #[serde(default)]
    pub owner_avatar_url: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("owner_login", &self.owner_login)
            .field("owner_display_name", &self.owner_display_name)
            .field("owner_email", &self.owner_email)
            .field("owner_avatar_url", &self.owner_avatar_url)
            .finish()
    }
}

impl Credential {
    /// Name and email used for commits made on the user's behalf
    pub fn commit_identity(&self) -> (String, String) {
        let name = if self.owner_display_name.is_empty() {
            self.owner_login.clone()
        } else {
            self.owner_display_name.clone()
        };
        let email = if self.owner_email.is_empty() || self.owner_email == NO_EMAIL {
            format!("{}@users.noreply.github.com", self.owner_login)
        } else {
            self.owner_email.clone()
        };
        (name, email)
    }

    pub fn signature(&self) -> Result<Signature<'static>, git2::Error> {
        let (name, email) = self.commit_identity();
        Signature::now(&name, &email)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credential: Option<Credential>,
}

/// Holds at most one credential, optionally backed by a YAML file
#[derive(Debug, Default)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    credential: Option<Credential>,
}

impl CredentialStore {
    /// Store that never touches the disk
    pub fn in_memory(credential: Option<Credential>) -> Self {
        Self {
            path: None,
            credential,
        }
    }

    /// Load the store from `path`; a missing file is an empty store
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let credential = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read credentials: {}", path.display()))?;
            let prefs: PreferencesFile = if contents.trim().is_empty() {
                PreferencesFile::default()
            } else {
                serde_yaml::from_str(&contents)
                    .with_context(|| format!("Failed to parse credentials: {}", path.display()))?
            };
            prefs.credential
        } else {
            None
        };

        Ok(Self {
            path: Some(path),
            credential,
        })
    }

    pub fn get(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.credential.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace the stored credential and persist it
    pub fn set(&mut self, credential: Credential) -> Result<()> {
        self.credential = Some(credential);
        self.persist()
    }

    /// Forget the credential and persist the empty store
    pub fn clear(&mut self) -> Result<()> {
        self.credential = None;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let prefs = PreferencesFile {
            credential: self.credential.clone(),
        };
        let yaml = serde_yaml::to_string(&prefs)?;
        write_private(path, yaml.as_bytes())
            .with_context(|| format!("Failed to write credentials: {}", path.display()))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credential {
        Credential {
            access_token: "gho_secret".to_string(),
            owner_login: "octocat".to_string(),
            owner_display_name: "The Octocat".to_string(),
            owner_email: NO_EMAIL.to_string(),
            owner_avatar_url: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("credentials.yaml")).unwrap();
        assert!(!store.is_registered());
    }

    #[test]
    fn test_set_persists_and_clear_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.yaml");

        let mut store = CredentialStore::load(&path).unwrap();
        store.set(sample()).unwrap();

        let reloaded = CredentialStore::load(&path).unwrap();
        assert_eq!(reloaded.get(), Some(&sample()));

        store.clear().unwrap();
        let reloaded = CredentialStore::load(&path).unwrap();
        assert!(reloaded.get().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.yaml");
        let mut store = CredentialStore::load(&path).unwrap();
        store.set(sample()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_redacts_token() {
        let printed = format!("{:?}", sample());
        assert!(!printed.contains("gho_secret"));
        assert!(printed.contains("octocat"));
    }

    #[test]
    fn test_commit_identity_replaces_sentinel() {
        let (name, email) = sample().commit_identity();
        assert_eq!(name, "The Octocat");
        assert_eq!(email, "octocat@users.noreply.github.com");

        let mut with_email = sample();
        with_email.owner_email = "cat@example.com".to_string();
        with_email.owner_display_name.clear();
        assert_eq!(
            with_email.commit_identity(),
            ("octocat".to_string(), "cat@example.com".to_string())
        );
    }
}
