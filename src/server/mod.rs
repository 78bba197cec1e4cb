//! HTTP server layer for the QR code manager.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        POST/GET /qr-codes/   DELETE /qr-codes/{filename}        │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  handlers   │  │     auth     │  │        routes          │  │
//! │  │ (requests)  │  │ (JWT bearer) │  │  (router config)       │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{
    bearer_auth_middleware, AccessToken, AuthError, Claims, JwtAuthority, Subject, TokenIssuer,
    TokenValidator,
};
pub use handlers::{
    create_qr_code_handler, delete_qr_code_handler, download_qr_code_handler, health_handler,
    list_qr_codes_handler, token_handler, validate_create_request, ApiError, ApiSettings,
    AppState, ErrorResponse, FieldError, HealthResponse, QrCodeRequest, QrCodeResponse, TokenForm,
};
pub use routes::{
    build_router, create_router, validate_download_folder, RouterConfig, DEFAULT_BACK_COLOR,
    DEFAULT_DOWNLOAD_FOLDER, DEFAULT_FILL_COLOR, RESERVED_ROUTE_SEGMENTS,
};
