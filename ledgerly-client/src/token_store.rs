//! Durable storage for the active credential.
//!
//! The controller never touches storage directly; it is handed a
//! [`TokenStore`] at construction.

use serde::{Deserialize, Serialize};
use shared::models::AuthType;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::debug;

use crate::error::StoreError;

/// What survives a restart: the bearer token and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub token: String,
    #[serde(default)]
    pub auth_type: AuthType,
}

impl StoredCredential {
    pub fn new(token: impl Into<String>, auth_type: AuthType) -> Self {
        Self {
            token: token.into(),
            auth_type,
        }
    }
}

/// Persistence port for the session credential.
pub trait TokenStore: Send + Sync {
    /// Read the persisted credential, if any.
    ///
    /// # Errors
    /// Returns [`StoreError`] when storage exists but cannot be read.
    fn load(&self) -> Result<Option<StoredCredential>, StoreError>;

    /// Replace the persisted credential.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the write fails.
    fn save(&self, credential: &StoredCredential) -> Result<(), StoreError>;

    /// Remove the persisted credential. Clearing empty storage succeeds.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the removal fails.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Credential kept in a JSON file readable only by the owner.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<StoredCredential>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        let credential: StoredCredential =
            serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &StoredCredential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let body = serde_json::to_vec_pretty(credential).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|err| self.io_error(err))?;

        // `mode` applies only to new files; tighten one left by an older version.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|err| self.io_error(err))?;
        }
        file.write_all(&body).map_err(|err| self.io_error(err))?;

        debug!(path = %self.path.display(), auth_type = %credential.auth_type, "credential saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "credential removed");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// Process-local store for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    credential: Mutex<Option<StoredCredential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: StoredCredential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }

    /// Current contents, for assertions.
    #[must_use]
    pub fn snapshot(&self) -> Option<StoredCredential> {
        self.credential
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<StoredCredential>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, credential: &StoredCredential) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.credential.lock() {
            *guard = Some(credential.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        if let Ok(mut guard) = self.credential.lock() {
            *guard = None;
        }
        Ok(())
    }
}
