//! Session store for the bearer token and signed-in identity
//!
//! A [`Session`] is a cheap, cloneable handle; every clone sees the same
//! state. The HTTP client reads the token from it for every authenticated
//! request and clears it when the server answers 401.

use crate::error::Result;
use crate::types::{SessionUser, SignInResponse};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Persisted session contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl SessionData {
    /// Build session data from a sign-in response.
    ///
    /// Returns `None` when the response carries no access token. A missing
    /// role defaults to `user`.
    pub fn from_sign_in(response: &SignInResponse) -> Option<Self> {
        let token = response.access_token.as_ref().filter(|t| !t.is_empty())?;
        let role = response
            .user
            .as_ref()
            .and_then(|u| u.role.clone())
            .unwrap_or_else(|| crate::types::roles::USER.to_string());

        Some(Self {
            access_token: Some(token.clone()),
            refresh_token: response.refresh_token.as_ref().map(|r| r.token().to_string()),
            role: Some(role),
            user: response.user.clone(),
        })
    }
}

/// Shared handle to the active session
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionData>>,
}

impl Session {
    /// Create an empty (signed-out) session
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from existing data
    pub fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current bearer token
    pub fn token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    /// Role of the signed-in user
    pub fn role(&self) -> Option<String> {
        self.read().role.clone()
    }

    /// Signed-in user details
    pub fn user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    /// Whether a bearer token is present
    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> SessionData {
        self.read().clone()
    }

    /// Replace the session contents after a successful sign-in
    pub fn establish(&self, data: SessionData) {
        *self.write() = data;
    }

    /// Tear the session down (sign-out or 401)
    pub fn clear(&self) {
        let mut data = self.write();
        if data.access_token.is_some() {
            tracing::info!("Session cleared");
        }
        *data = SessionData::default();
    }

    /// Load a persisted session; a missing file yields an empty session
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let data: SessionData = serde_json::from_str(&content)?;
        Ok(Self::from_data(data))
    }

    /// Persist the session; a signed-out session removes the file
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = self.snapshot();
        if data.access_token.is_none() {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_private(path, serde_json::to_string_pretty(&data)?.as_bytes())?;
        Ok(())
    }
}

/// Write a file readable by the owner only; it holds bearer tokens
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on create; tighten a file left by an older run
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RefreshToken;
    use tempfile::TempDir;

    #[test]
    fn test_from_sign_in_defaults_role() {
        let response = SignInResponse {
            access_token: Some("tok".into()),
            refresh_token: Some(RefreshToken::Wrapped { token: "ref".into() }),
            ..Default::default()
        };
        let data = SessionData::from_sign_in(&response).unwrap();
        assert_eq!(data.role.as_deref(), Some("user"));
        assert_eq!(data.refresh_token.as_deref(), Some("ref"));

        assert!(SessionData::from_sign_in(&SignInResponse::default()).is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        session.establish(SessionData {
            access_token: Some("tok".into()),
            ..Default::default()
        });
        assert_eq!(other.token().as_deref(), Some("tok"));

        other.clear();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = Session::from_data(SessionData {
            access_token: Some("tok".into()),
            role: Some("admin".into()),
            ..Default::default()
        });
        session.persist(&path).unwrap();

        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded.snapshot(), session.snapshot());

        loaded.clear();
        loaded.persist(&path).unwrap();
        assert!(!path.exists());
        assert!(!Session::load(&path).unwrap().is_authenticated());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let session = Session::from_data(SessionData {
            access_token: Some("secret".into()),
            refresh_token: Some("refresh".into()),
            ..Default::default()
        });
        session.persist(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0, "session file mode {:o}", mode & 0o777);
        assert_eq!(Session::load(&path).unwrap().token().as_deref(), Some("secret"));
    }
}
