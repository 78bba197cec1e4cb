//! # QR Code Manager
//!
//! An HTTP service that turns URLs into QR code PNG images stored on local
//! disk, lists them and deletes them.
//!
//! Each image's filename is derived reversibly from its URL, so the
//! directory itself is the only state: listing decodes filenames back to
//! URLs and creating the same URL twice is detected from the filename.
//!
//! ## Features
//!
//! - **Reversible naming**: URL-safe base64 tokens, no database needed
//! - **Atomic publishing**: images appear complete or not at all
//! - **Bearer authentication**: OAuth2 password flow issuing HMAC-signed JWTs
//! - **Hypermedia links**: every response carries follow-up actions
//!
//! ## Architecture
//!
//! - [`qr`] - Filename codec, PNG rendering and the create/list/delete service
//! - [`store`] - Directory access for stored images
//! - [`links`] - Hypermedia link construction
//! - [`server`] - Axum-based HTTP server, routes and authentication
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use qr_code_manager::{create_router, JwtAuthority, QrService, QrStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = QrStore::new("./qr_codes");
//!     store.ensure_directory().await.unwrap();
//!
//!     let authority = JwtAuthority::new("change-me", "admin", "secret");
//!     let router = create_router(
//!         QrService::new(store),
//!         authority,
//!         RouterConfig::new("http://localhost:3000"),
//!     )
//!     .unwrap();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod links;
pub mod qr;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{CodecError, QrError, ServiceError, StoreError};
pub use links::{build_links, download_url, Link, LinkAction};
pub use qr::{
    decode_filename_to_url, encode_url_to_filename, CreateOutcome, CreateQrRequest, QrEncoder,
    QrRecord, QrService, RenderOptions,
};
pub use server::{
    bearer_auth_middleware, create_router, AppState, AuthError, ErrorResponse, JwtAuthority,
    QrCodeRequest, QrCodeResponse, RouterConfig, TokenIssuer, TokenValidator,
};
pub use store::QrStore;
