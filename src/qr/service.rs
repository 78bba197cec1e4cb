//! QR service orchestrating codec, encoder and store.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          QrService                            │
//! │   create():  encode URL -> exists? -> render + publish        │
//! │   list():    list *.png -> decode each token                  │
//! │   delete():  validate name -> unlink                          │
//! │        │                  │                     │             │
//! │        ▼                  ▼                     ▼             │
//! │  ┌───────────┐     ┌─────────────┐      ┌─────────────┐       │
//! │  │   codec   │     │  QrEncoder  │      │   QrStore   │       │
//! │  └───────────┘     └─────────────┘      └─────────────┘       │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{QrError, ServiceError};
use crate::store::QrStore;

use super::codec::{decode_filename_to_url, encode_url_to_filename, qr_filename, strip_png_suffix};
use super::encoder::{QrEncoder, DEFAULT_BOX_SIZE};

// =============================================================================
// Request / Record
// =============================================================================

/// Parameters for creating a QR code.
#[derive(Debug, Clone)]
pub struct CreateQrRequest {
    /// URL to encode
    pub url: String,

    /// Colour of dark modules
    pub fill_color: String,

    /// Background colour
    pub back_color: String,

    /// Pixel width of one module (already validated by the caller)
    pub box_size: u32,
}

impl CreateQrRequest {
    /// Request with black-on-white modules of the default size.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fill_color: "black".to_string(),
            back_color: "white".to_string(),
            box_size: DEFAULT_BOX_SIZE,
        }
    }

    pub fn with_colors(mut self, fill: impl Into<String>, back: impl Into<String>) -> Self {
        self.fill_color = fill.into();
        self.back_color = back.into();
        self
    }

    pub fn with_box_size(mut self, box_size: u32) -> Self {
        self.box_size = box_size;
        self
    }
}

/// A QR code as derived from the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrRecord {
    /// Source URL
    pub url: String,

    /// Encoded token (filename without suffix)
    pub token: String,

    /// Image filename (`{token}.png`)
    pub filename: String,
}

/// Result of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new image was written
    Created(QrRecord),

    /// An image for this URL was already present; nothing was written
    AlreadyExists(QrRecord),
}

impl CreateOutcome {
    pub fn record(&self) -> &QrRecord {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::AlreadyExists(r) => r,
        }
    }
}

// =============================================================================
// QR Service
// =============================================================================

/// Create, list and delete QR codes in a [`QrStore`].
#[derive(Debug, Clone)]
pub struct QrService {
    store: Arc<QrStore>,
    encoder: QrEncoder,
}

impl QrService {
    pub fn new(store: QrStore) -> Self {
        Self::with_encoder(store, QrEncoder::new())
    }

    pub fn with_encoder(store: QrStore, encoder: QrEncoder) -> Self {
        Self {
            store: Arc::new(store),
            encoder,
        }
    }

    pub fn store(&self) -> &QrStore {
        &self.store
    }

    /// Create the QR image for `request.url` unless one already exists.
    ///
    /// Rendering runs on the blocking pool. The image is linked into place
    /// atomically, so a concurrent create for the same URL that loses the
    /// race also yields [`CreateOutcome::AlreadyExists`].
    pub async fn create(&self, request: CreateQrRequest) -> Result<CreateOutcome, ServiceError> {
        let token = encode_url_to_filename(&request.url).map_err(|e| {
            warn!(operation = "create", url = %request.url, error = %e, "Failed to encode URL");
            e
        })?;
        let filename = qr_filename(&token);
        let record = QrRecord {
            url: request.url.clone(),
            token,
            filename,
        };

        if self.store.exists(&record.filename).await {
            info!(operation = "create", filename = %record.filename, "QR code already exists");
            return Ok(CreateOutcome::AlreadyExists(record));
        }

        let path = self.store.path_for(&record.filename);
        let encoder = self.encoder.clone();
        let task_path = path.clone();
        let result = tokio::task::spawn_blocking(move || {
            encoder.generate(
                &request.url,
                &task_path,
                &request.fill_color,
                &request.back_color,
                request.box_size,
            )
        })
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?;

        match result {
            Ok(()) => {
                debug!(operation = "create", filename = %record.filename, "QR code created");
                Ok(CreateOutcome::Created(record))
            }
            Err(QrError::AlreadyExists { .. }) => {
                info!(
                    operation = "create",
                    filename = %record.filename,
                    "QR code appeared concurrently"
                );
                Ok(CreateOutcome::AlreadyExists(record))
            }
            Err(e) => {
                error!(
                    operation = "create",
                    path = %path.display(),
                    error = %e,
                    "Failed to generate/save QR code"
                );
                Err(e.into())
            }
        }
    }

    /// All QR codes currently in the store.
    ///
    /// Files whose names do not decode to a URL are skipped.
    pub async fn list(&self) -> Result<Vec<QrRecord>, ServiceError> {
        let filenames = self.store.list().await?;

        let records = filenames
            .into_iter()
            .filter_map(|filename| {
                let token = strip_png_suffix(&filename)?.to_string();
                match decode_filename_to_url(&token) {
                    Ok(url) => Some(QrRecord {
                        url,
                        token,
                        filename,
                    }),
                    Err(e) => {
                        warn!(
                            operation = "list",
                            filename = %filename,
                            error = %e,
                            "Skipping file with undecodable name"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok(records)
    }

    /// Delete the image named `filename`.
    pub async fn delete(&self, filename: &str) -> Result<(), ServiceError> {
        self.store.delete(filename).await?;
        Ok(())
    }
}
