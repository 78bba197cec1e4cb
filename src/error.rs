use std::path::PathBuf;

use thiserror::Error;

/// Errors from the reversible URL <-> filename encoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Nothing to encode or decode
    #[error("Cannot encode an empty value")]
    Empty,

    /// Encoded token would not fit in a single filename
    #[error("Encoded filename too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    /// Token contains characters outside the URL-safe base64 alphabet
    #[error("Invalid filename token: {0}")]
    InvalidToken(String),

    /// Token decodes to bytes that are not UTF-8
    #[error("Filename token does not decode to UTF-8 text")]
    InvalidUtf8,
}

/// Errors that can occur when rendering and saving a QR image
#[derive(Debug, Clone, Error)]
pub enum QrError {
    /// Nothing to put in the symbol
    #[error("QR payload is empty")]
    EmptyPayload,

    /// Payload exceeds the largest QR version at the chosen error correction level
    #[error("QR payload too large: {len} bytes")]
    PayloadTooLarge { len: usize },

    /// Colour parsing or PNG encoding failed
    #[error("Render error: {message}")]
    Render { message: String },

    /// The target file was created by someone else first
    #[error("QR image already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// Writing the image to disk failed
    #[error("I/O error writing {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

/// Errors from the QR image directory
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The QR directory itself is missing
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// No image with this filename
    #[error("QR code not found: {0}")]
    NotFound(String),

    /// The process lacks rights on the directory or file
    #[error("Permission denied on {}: {message}", path.display())]
    PermissionDenied { path: PathBuf, message: String },

    /// Any other filesystem failure
    #[error("I/O error on {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

/// Errors surfaced by the QR service to the HTTP layer
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// URL could not be turned into a filename (or back)
    #[error("Encoding error: {0}")]
    Encoding(#[from] CodecError),

    /// Image generation failed
    #[error(transparent)]
    Qr(#[from] QrError),

    /// Directory or file operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking render task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Classify an `std::io::Error` raised while touching `path`.
    pub(crate) fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                path,
                message: err.to_string(),
            },
            _ => StoreError::Io {
                path,
                message: err.to_string(),
            },
        }
    }
}
