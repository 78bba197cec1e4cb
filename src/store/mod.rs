//! Directory-backed storage for QR images.
//!
//! The store is a single flat directory. Each QR code is one
//! `{token}.png` file and the directory listing is the only index; there
//! are no subdirectories and no manifest.
//!
//! ```text
//! qr_codes/
//! ├── aHR0cHM6Ly9leGFtcGxlLmNvbQ.png
//! └── aHR0cHM6Ly9ydXN0LWxhbmcub3Jn.png
//! ```
//!
//! No cross-request locking is done. `delete` checks then unlinks; if the
//! file disappears in between, the unlink's `NotFound` is reported as
//! [`StoreError::NotFound`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::StoreError;
use crate::qr::QR_FILE_SUFFIX;

/// Flat directory of QR images.
#[derive(Debug, Clone)]
pub struct QrStore {
    directory: PathBuf,
}

impl QrStore {
    /// Create a store rooted at `directory`. Nothing is touched on disk.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory holding the images.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Absolute (or directory-relative) path of an image file.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.directory.join(filename)
    }

    /// Create the directory (and parents) if missing. Idempotent.
    pub async fn ensure_directory(&self) -> Result<(), StoreError> {
        debug!(path = %self.directory.display(), "Ensuring QR directory");
        match tokio::fs::create_dir_all(&self.directory).await {
            Ok(()) => {
                info!(path = %self.directory.display(), "Directory ensured");
                Ok(())
            }
            Err(e) => {
                let err = StoreError::from_io(&self.directory, e);
                error!(path = %self.directory.display(), error = %err, "Failed to create directory");
                Err(err)
            }
        }
    }

    /// List image filenames (`*.png`) in the directory.
    ///
    /// Order follows filesystem enumeration and is not stable. The directory
    /// is not created when missing.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(path = %self.directory.display(), "Directory not found");
                return Err(StoreError::DirectoryNotFound(self.directory.clone()));
            }
            Err(e) => {
                let err = StoreError::from_io(&self.directory, e);
                error!(error = %err, "An error occurred while listing QR codes");
                return Err(err);
            }
        };

        let mut filenames = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::from_io(&self.directory, e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !is_valid_filename(&name) {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                filenames.push(name);
            }
        }

        debug!(count = filenames.len(), "Listed QR codes");
        Ok(filenames)
    }

    /// Whether an image with this filename is present.
    pub async fn exists(&self, filename: &str) -> bool {
        if !is_valid_filename(filename) {
            return false;
        }
        tokio::fs::metadata(self.path_for(filename))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Delete an image.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the file is absent or the name is not a
    ///   valid image filename
    /// - [`StoreError::PermissionDenied`] / [`StoreError::Io`] on unlink failure
    pub async fn delete(&self, filename: &str) -> Result<(), StoreError> {
        if !self.exists(filename).await {
            error!(filename = filename, "QR code not found for deletion");
            return Err(StoreError::NotFound(filename.to_string()));
        }

        let path = self.path_for(filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(filename = filename, "QR code deleted successfully");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => {
                let err = StoreError::from_io(&path, e);
                error!(filename = filename, error = %err, "Error occurred while deleting QR code");
                Err(err)
            }
        }
    }
}

/// Whether `filename` could name an image in the store.
///
/// Rejects path separators, parent references, hidden names (temp files
/// start with `.`) and anything without the `.png` suffix.
pub fn is_valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(&['/', '\\', '\0'][..])
        && !filename.contains("..")
        && filename.len() > QR_FILE_SUFFIX.len()
        && filename.ends_with(QR_FILE_SUFFIX)
}
