//! QR image encoder.
//!
//! Turns a payload string into a QR symbol (via `qrcode`) and rasterises it
//! into a PNG (via `image`).
//!
//! # Design Decisions
//!
//! - **Fit to payload**: the smallest QR version that holds the payload at
//!   error correction level M is chosen; payloads beyond version 40 fail
//!   with [`QrError::PayloadTooLarge`] instead of being truncated.
//!
//! - **Own rasteriser**: modules are painted directly into an RGBA buffer so
//!   the quiet zone can be 5 modules wide and colours can carry alpha.
//!
//! - **Atomic publish**: [`QrEncoder::generate`] writes to a hidden temp file
//!   next to the target and links it into place only if the target does not
//!   exist yet. Readers never observe a partial `.png`, and an existing image
//!   is never overwritten.

use std::io::{Cursor, Write};
use std::path::Path;

use bytes::Bytes;
use image::{ImageFormat, RgbaImage};
use qrcode::types::QrError as SymbolError;
use qrcode::{Color, EcLevel, QrCode};
use tracing::{debug, info};

use super::color::parse_color;
use crate::error::QrError;

/// Default pixel width of one QR module.
pub const DEFAULT_BOX_SIZE: u32 = 10;

/// Minimum allowed box size.
pub const MIN_BOX_SIZE: u32 = 1;

/// Maximum box size accepted by the API.
pub const MAX_BOX_SIZE: u32 = 20;

/// Quiet-zone width in modules.
pub const DEFAULT_BORDER: u32 = 5;

// =============================================================================
// Render Options
// =============================================================================

/// How a QR symbol is painted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Colour of dark modules (name or hex)
    pub fill_color: String,

    /// Colour of light modules and the quiet zone
    pub back_color: String,

    /// Pixel width of one module
    pub box_size: u32,
}

impl RenderOptions {
    pub fn new(fill_color: impl Into<String>, back_color: impl Into<String>, box_size: u32) -> Self {
        Self {
            fill_color: fill_color.into(),
            back_color: back_color.into(),
            box_size,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new("black", "white", DEFAULT_BOX_SIZE)
    }
}

// =============================================================================
// QR Encoder
// =============================================================================

/// Encoder from payload strings to PNG QR images.
///
/// # Example
///
/// ```
/// use qr_code_manager::qr::{QrEncoder, RenderOptions};
///
/// let encoder = QrEncoder::new();
/// let png = encoder
///     .render("https://example.com", &RenderOptions::new("red", "white", 4))
///     .unwrap();
/// assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
/// ```
#[derive(Debug, Clone)]
pub struct QrEncoder {
    ec_level: EcLevel,
    border: u32,
}

impl QrEncoder {
    /// Create an encoder with error correction level M and a 5-module border.
    pub fn new() -> Self {
        Self {
            ec_level: EcLevel::M,
            border: DEFAULT_BORDER,
        }
    }

    /// Override the quiet-zone width.
    pub fn with_border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    /// Render `data` as a PNG image.
    ///
    /// `options.box_size` must already be within
    /// [`MIN_BOX_SIZE`]..=[`MAX_BOX_SIZE`]; callers validate it.
    ///
    /// # Errors
    ///
    /// - [`QrError::EmptyPayload`] if `data` is empty
    /// - [`QrError::PayloadTooLarge`] if no QR version can hold `data`
    /// - [`QrError::Render`] for invalid colours or PNG encoding failures
    pub fn render(&self, data: &str, options: &RenderOptions) -> Result<Bytes, QrError> {
        debug_assert!(
            is_valid_box_size(options.box_size),
            "box_size {} outside {}..={}",
            options.box_size,
            MIN_BOX_SIZE,
            MAX_BOX_SIZE
        );

        if data.is_empty() {
            return Err(QrError::EmptyPayload);
        }

        let fill = parse_color(&options.fill_color)?;
        let back = parse_color(&options.back_color)?;

        let code = QrCode::with_error_correction_level(data.as_bytes(), self.ec_level).map_err(
            |e| match e {
                SymbolError::DataTooLong => QrError::PayloadTooLarge { len: data.len() },
                other => QrError::Render {
                    message: other.to_string(),
                },
            },
        )?;

        let modules = code.width() as u32;
        let box_size = options.box_size.max(MIN_BOX_SIZE);
        let side = (modules + 2 * self.border) * box_size;

        let mut img = RgbaImage::from_pixel(side, side, back);
        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let mx = index as u32 % modules;
            let my = index as u32 / modules;
            let x0 = (mx + self.border) * box_size;
            let y0 = (my + self.border) * box_size;
            for y in y0..y0 + box_size {
                for x in x0..x0 + box_size {
                    img.put_pixel(x, y, fill);
                }
            }
        }

        let mut output = Vec::new();
        img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
            .map_err(|e| QrError::Render {
                message: e.to_string(),
            })?;

        debug!(
            modules = modules,
            pixels = side,
            bytes = output.len(),
            "Rendered QR code"
        );

        Ok(Bytes::from(output))
    }

    /// Render `data` and publish it at `target_path`.
    ///
    /// The parent directory of `target_path` must exist.
    ///
    /// # Errors
    ///
    /// Everything [`render`](Self::render) returns, plus
    /// [`QrError::AlreadyExists`] if `target_path` is present and
    /// [`QrError::Io`] for filesystem failures.
    pub fn generate(
        &self,
        data: &str,
        target_path: &Path,
        fill_color: &str,
        back_color: &str,
        box_size: u32,
    ) -> Result<(), QrError> {
        let png = self.render(data, &RenderOptions::new(fill_color, back_color, box_size))?;
        write_new_file(target_path, &png)?;
        info!(path = %target_path.display(), bytes = png.len(), "QR code saved");
        Ok(())
    }
}

impl Default for QrEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `contents` to a temp file beside `target` and link it into place,
/// failing if `target` already exists.
fn write_new_file(target: &Path, contents: &[u8]) -> Result<(), QrError> {
    let io_err = |e: std::io::Error| QrError::Io {
        path: target.to_path_buf(),
        message: e.to_string(),
    };

    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".qr-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    temp.write_all(contents).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    temp.persist_noclobber(target).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            QrError::AlreadyExists {
                path: target.to_path_buf(),
            }
        } else {
            io_err(e.error)
        }
    })?;

    Ok(())
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Returns `true` if `box_size` is in the range the API accepts (1-20).
#[inline]
pub fn is_valid_box_size(box_size: u32) -> bool {
    (MIN_BOX_SIZE..=MAX_BOX_SIZE).contains(&box_size)
}
