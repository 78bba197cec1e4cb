//! QR code generation layer.
//!
//! # Components
//!
//! - [`QrService`]: entry point for create/list/delete, used by the HTTP layer
//! - [`QrEncoder`]: renders payloads to PNG and publishes them atomically
//! - codec functions: reversible URL <-> filename mapping
//! - [`parse_color`]: colour strings understood by the renderer
//!
//! # Example
//!
//! ```no_run
//! use qr_code_manager::qr::{CreateQrRequest, CreateOutcome, QrService};
//! use qr_code_manager::store::QrStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = QrStore::new("./qr_codes");
//!     store.ensure_directory().await.unwrap();
//!
//!     let service = QrService::new(store);
//!     let request = CreateQrRequest::new("https://example.com").with_colors("red", "white");
//!
//!     match service.create(request).await.unwrap() {
//!         CreateOutcome::Created(record) => println!("created {}", record.filename),
//!         CreateOutcome::AlreadyExists(record) => println!("exists {}", record.filename),
//!     }
//! }
//! ```

mod codec;
mod color;
mod encoder;
mod service;

pub use codec::{
    decode_filename_to_url, encode_url_to_filename, qr_filename, strip_png_suffix, MAX_TOKEN_LEN,
    QR_FILE_SUFFIX,
};
pub use color::parse_color;
pub use encoder::{
    is_valid_box_size, QrEncoder, RenderOptions, DEFAULT_BORDER, DEFAULT_BOX_SIZE, MAX_BOX_SIZE,
    MIN_BOX_SIZE,
};
pub use service::{CreateOutcome, CreateQrRequest, QrRecord, QrService};
