//! Router configuration for the QR code API.
//!
//! This module defines the HTTP routes and applies middleware for bearer
//! authentication, CORS and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                        - Health check (public)
//! /token                         - OAuth2 password grant (public)
//! /{download_folder}/{filename}  - Image download (public)
//! /qr-codes/                     - Create (POST) / list (GET) (protected)
//! /qr-codes/{filename}           - Delete (DELETE) (protected)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use qr_code_manager::qr::QrService;
//! use qr_code_manager::server::{auth::JwtAuthority, create_router, RouterConfig};
//! use qr_code_manager::store::QrStore;
//!
//! let service = QrService::new(QrStore::new("./qr_codes"));
//! let authority = JwtAuthority::new("my-secret-key", "admin", "secret");
//! let router = create_router(service, authority, RouterConfig::new("http://localhost:3000"))?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE, LINK};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{bearer_auth_middleware, TokenIssuer, TokenValidator};
use super::handlers::{
    create_qr_code_handler, delete_qr_code_handler, download_qr_code_handler, health_handler,
    list_qr_codes_handler, token_handler, ApiSettings, AppState,
};
use crate::qr::QrService;

/// Default route segment images are served from.
pub const DEFAULT_DOWNLOAD_FOLDER: &str = "downloads";

/// Default colour of dark modules.
pub const DEFAULT_FILL_COLOR: &str = "red";

/// Default background colour.
pub const DEFAULT_BACK_COLOR: &str = "white";

/// Top-level path segments owned by the API. The download folder cannot reuse them.
pub const RESERVED_ROUTE_SEGMENTS: &[&str] = &["qr-codes", "token", "health"];

/// Check that `folder` can be mounted as the download route segment.
///
/// Leading and trailing slashes are ignored. The rest must be one segment of
/// unreserved URL characters that does not collide with an API route.
pub fn validate_download_folder(folder: &str) -> Result<(), String> {
    let segment = folder.trim_matches('/');

    if segment.is_empty() || segment.contains('/') {
        return Err("download_folder must be a single non-empty path segment".to_string());
    }

    if segment == "." || segment == ".." {
        return Err(format!("download_folder cannot be '{}'", segment));
    }

    if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
    {
        return Err(format!(
            "download_folder '{}' may only contain letters, digits, '-', '_', '.' and '~'",
            segment
        ));
    }

    if RESERVED_ROUTE_SEGMENTS.contains(&segment) {
        return Err(format!(
            "download_folder '{}' collides with an API route (reserved: {})",
            segment,
            RESERVED_ROUTE_SEGMENTS.join(", ")
        ));
    }

    Ok(())
}

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Public base URL used in download URLs and links
    pub base_url: String,

    /// Route segment images are downloaded from
    pub download_folder: String,

    /// Fill colour for requests that omit one
    pub fill_color: String,

    /// Background colour for requests that omit one
    pub back_color: String,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration for the given public base URL.
    ///
    /// By default:
    /// - Images are served under `/downloads`
    /// - Codes are red on white
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            download_folder: DEFAULT_DOWNLOAD_FOLDER.to_string(),
            fill_color: DEFAULT_FILL_COLOR.to_string(),
            back_color: DEFAULT_BACK_COLOR.to_string(),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set the download route segment.
    pub fn with_download_folder(mut self, folder: impl Into<String>) -> Self {
        self.download_folder = folder.into();
        self
    }

    /// Set default colours.
    pub fn with_colors(mut self, fill: impl Into<String>, back: impl Into<String>) -> Self {
        self.fill_color = fill.into();
        self.back_color = back.into();
        self
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Check that the configuration can be turned into a router.
    pub fn validate(&self) -> Result<(), String> {
        validate_download_folder(&self.download_folder)
    }

    fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            download_folder: self.download_folder.trim_matches('/').to_string(),
            fill_color: self.fill_color.clone(),
            back_color: self.back_color.clone(),
        }
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `service` - QR service over the image directory
/// * `authority` - Issues tokens at `/token` and validates bearer tokens
/// * `config` - Router configuration
///
/// # Errors
///
/// Returns a message if the download folder is not a usable route segment
/// (see [`validate_download_folder`]).
pub fn create_router<A>(
    service: QrService,
    authority: A,
    config: RouterConfig,
) -> Result<Router, String>
where
    A: TokenValidator + TokenIssuer + 'static,
{
    config.validate()?;
    let state = AppState::new(service, authority, config.api_settings());
    build_router(state, &config)
}

/// Build the router from prepared state.
///
/// # Errors
///
/// Returns a message if `state.settings.download_folder` is not a usable
/// route segment.
pub fn build_router(state: AppState, config: &RouterConfig) -> Result<Router, String> {
    validate_download_folder(&state.settings.download_folder)?;
    let download_route = format!(
        "/{}/{{filename}}",
        state.settings.download_folder.trim_matches('/')
    );

    // Protected QR routes; route_layer keeps unknown paths at 404 instead of 401
    let qr_routes = Router::new()
        .route(
            "/qr-codes/",
            post(create_qr_code_handler).get(list_qr_codes_handler),
        )
        .route(
            "/qr-codes",
            post(create_qr_code_handler).get(list_qr_codes_handler),
        )
        .route("/qr-codes/{filename}", delete(delete_qr_code_handler))
        .route_layer(middleware::from_fn_with_state(
            state.validator.clone(),
            bearer_auth_middleware,
        ));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/token", post(token_handler))
        .route(&download_route, get(download_qr_code_handler));

    let router = Router::new()
        .merge(qr_routes)
        .merge(public_routes)
        .with_state(state)
        .layer(build_cors_layer(config));

    if config.enable_tracing {
        Ok(router.layer(TraceLayer::new_for_http()))
    } else {
        Ok(router)
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .expose_headers([LINK])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
