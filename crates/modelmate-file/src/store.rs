//! Filesystem storage for the credential pair.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, instrument, warn};

use modelmate_core::error::StorageError;
use modelmate_core::{TokenPair, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A token store backed by a single JSON file.
///
/// The file holds `{"access": ..., "refresh": ...}`. Writes go to a sibling
/// temp file under an exclusive lock and are renamed into place, so readers
/// see either the old pair or the new one.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store for the given file path. Nothing is touched on disk
    /// until the first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    /// Read the stored pair, reporting why it could not be read.
    pub fn try_get(&self) -> Result<TokenPair, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TokenPair::empty()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
            message: e.to_string(),
        })
    }

    /// Replace the stored pair, reporting any failure.
    #[instrument(skip(self, pair), fields(path = %self.path.display()))]
    pub fn try_set(&self, pair: &TokenPair) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        lock_file.lock_exclusive()?;

        let json = serde_json::to_string(pair).map_err(|e| StorageError::Corrupt {
            message: e.to_string(),
        })?;

        let temp_path = self.temp_path();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;

        // Set restrictive permissions before any secret is written (Unix only)
        #[cfg(unix)]
        {
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms)?;
        }

        file.write_all(json.as_bytes())?;
        file.sync_data()?;
        fs::rename(&temp_path, &self.path)?;

        lock_file.unlock()?;

        debug!("Credential pair written");
        Ok(())
    }

    /// Remove the stored pair, reporting any failure other than absence.
    pub fn try_clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> TokenPair {
        self.try_get().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring unreadable credential file");
            TokenPair::empty()
        })
    }

    fn set(&self, pair: &TokenPair) {
        if let Err(e) = self.try_set(pair) {
            warn!(path = %self.path.display(), error = %e, "Failed to persist credential pair");
        }
    }

    fn clear(&self) {
        if let Err(e) = self.try_clear() {
            warn!(path = %self.path.display(), error = %e, "Failed to remove credential file");
        }
    }
}
