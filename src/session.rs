//! Access token handling and the explicit current-user context.
//!
//! Key properties:
//! - Token bytes are zeroed on drop
//! - The token persists between runs only through a `TokenStore`
//! - Controllers receive a `Session` argument, never a global lookup

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use zeroize::Zeroize;

use crate::capabilities::{CapabilitySet, Viewer};
use crate::models::UserPublic;

// ═══════════════════════════════════════════════════════════
// AccessToken — zeroed on drop
// ═══════════════════════════════════════════════════════════

/// Bearer token issued by `loginAccessToken`.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct AccessToken {
    value: String,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Raw token for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

// ═══════════════════════════════════════════════════════════
// Token persistence
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No home directory to store the access token")]
    NoStorageDir,
    #[error("Token storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the access token lives between runs.
pub trait TokenStore {
    fn load(&self) -> Result<Option<AccessToken>, SessionError>;
    fn save(&self, token: &AccessToken) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;

    /// Logged in means a token is stored; validity is the backend's call.
    fn is_logged_in(&self) -> bool {
        matches!(self.load(), Ok(Some(_)))
    }
}

/// Token kept in a single file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the application data directory.
    pub fn default_location() -> Result<Self, SessionError> {
        crate::config::token_path()
            .map(Self::new)
            .ok_or(SessionError::NoStorageDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(mut raw) => {
                let token = raw.trim();
                let result = (!token.is_empty()).then(|| AccessToken::new(token));
                raw.zeroize();
                Ok(result)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &AccessToken) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.expose())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token kept only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RefCell<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, SessionError> {
        Ok(self.token.borrow().clone())
    }

    fn save(&self, token: &AccessToken) -> Result<(), SessionError> {
        *self.token.borrow_mut() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.token.borrow_mut().take();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Session — the current user, passed explicitly
// ═══════════════════════════════════════════════════════════

/// Authenticated user context handed to every controller.
#[derive(Debug, Clone)]
pub struct Session {
    user: UserPublic,
    token: AccessToken,
}

impl Session {
    pub fn new(user: UserPublic, token: AccessToken) -> Self {
        Self { user, token }
    }

    pub fn user(&self) -> &UserPublic {
        &self.user
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn viewer(&self) -> Viewer {
        Viewer::of(&self.user)
    }

    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::for_viewer(self.viewer())
    }

    pub fn is_current(&self, user_id: uuid::Uuid) -> bool {
        self.user.id == user_id
    }

    /// Refresh the cached profile after a self-service update.
    pub fn replace_user(&mut self, user: UserPublic) {
        self.user = user;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_token() {
        let token = AccessToken::new("secret-value");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.expose(), "secret-value");
    }

    #[test]
    fn file_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(tmp.path().join("nested").join("access_token"));
        assert!(store.load().unwrap().is_none());
        assert!(!store.is_logged_in());

        store.save(&AccessToken::new("abc123")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().expose(), "abc123");
        assert!(store.is_logged_in());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn blank_token_file_means_logged_out() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("access_token");
        std::fs::write(&path, "  \n").unwrap();
        let store = FileTokenStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        store.save(&AccessToken::new("t")).unwrap();
        assert!(store.is_logged_in());
        store.clear().unwrap();
        assert!(!store.is_logged_in());
    }
}
