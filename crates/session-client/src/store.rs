//! Client credential storage
//!
//! Two stores with deliberately different lifetimes:
//!
//! - `AccessTokenCell`: volatile memory only. Lost on process restart,
//!   which forces a renewal on first use. Never written to disk.
//! - `RefreshTokenFile`: a single-token file that survives restart so
//!   renewal can proceed without re-authentication. All writes use atomic
//!   temp-file + rename to prevent corruption on crash, with 0600
//!   permissions.
//!
//! Both are written by coordinator completion, login, and logout — nothing
//! else mutates them.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// In-memory holder for the current access token.
///
/// Initialized empty at process start, cleared on renewal failure or
/// explicit logout, never persisted.
#[derive(Default)]
pub struct AccessTokenCell {
    state: Mutex<Option<String>>,
}

impl AccessTokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.state.lock().await.clone()
    }

    pub async fn set(&self, token: String) {
        *self.state.lock().await = Some(token);
    }

    pub async fn clear(&self) {
        *self.state.lock().await = None;
    }
}

/// Durable storage for the refresh token.
///
/// The file holds exactly the token string or is absent — no other auth
/// state is persisted. A tokio Mutex serializes writes from login and
/// coordinator completion.
pub struct RefreshTokenFile {
    path: PathBuf,
    state: Mutex<Option<String>>,
}

impl RefreshTokenFile {
    /// Load the stored token from the given path.
    ///
    /// A missing file means no stored token (cold start). An empty or
    /// whitespace-only file is treated the same way.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading refresh token file: {e}")))?;
            let token = contents.trim();
            if token.is_empty() {
                None
            } else {
                debug!(path = %path.display(), "loaded refresh token");
                Some(token.to_owned())
            }
        } else {
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub async fn get(&self) -> Option<String> {
        self.state.lock().await.clone()
    }

    /// Replace the stored token and persist to disk.
    pub async fn set(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        write_atomic(&self.path, token).await?;
        *state = Some(token.to_owned());
        Ok(())
    }

    /// Remove the stored token. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.path.exists() {
            tokio::fs::remove_file(&self.path)
                .await
                .map_err(|e| Error::Io(format!("removing refresh token file: {e}")))?;
        }
        *state = None;
        debug!(path = %self.path.display(), "cleared refresh token");
        Ok(())
    }
}

/// Write the token to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only)
/// since the file contains a live credential.
async fn write_atomic(path: &Path, token: &str) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("refresh token path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".refresh-token.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, token.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp refresh token file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting refresh token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp refresh token file: {e}")))?;

    debug!(path = %path.display(), "persisted refresh token");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn access_cell_starts_empty_and_clears() {
        let cell = AccessTokenCell::new();
        assert!(cell.get().await.is_none());

        cell.set("at_abc".into()).await;
        assert_eq!(cell.get().await.as_deref(), Some("at_abc"));

        cell.clear().await;
        assert!(cell.get().await.is_none());
    }

    #[tokio::test]
    async fn refresh_file_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh-token");

        let store = RefreshTokenFile::load(path.clone()).await.unwrap();
        assert!(store.get().await.is_none());
        store.set("rt_abc").await.unwrap();

        // Simulated process restart
        let store2 = RefreshTokenFile::load(path).await.unwrap();
        assert_eq!(store2.get().await.as_deref(), Some("rt_abc"));
    }

    #[tokio::test]
    async fn refresh_file_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh-token");

        let store = RefreshTokenFile::load(path.clone()).await.unwrap();
        store.set("rt_abc").await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert!(store.get().await.is_none());

        // Idempotent
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn whitespace_only_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh-token");
        tokio::fs::write(&path, "  \n  ").await.unwrap();

        let store = RefreshTokenFile::load(path).await.unwrap();
        assert!(store.get().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn refresh_file_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh-token");

        let store = RefreshTokenFile::load(path.clone()).await.unwrap();
        store.set("rt_abc").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "token file must be owner-only");
    }
}
