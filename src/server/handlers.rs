//! HTTP request handlers for the QR code API.
//!
//! # Endpoints
//!
//! - `POST /token` - Exchange credentials for a bearer token
//! - `POST /qr-codes/` - Create a QR code for a URL
//! - `GET /qr-codes/` - List QR codes
//! - `DELETE /qr-codes/{filename}` - Delete a QR code
//! - `GET /{download_folder}/{filename}` - Download a QR image
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, info, warn};

use crate::error::{QrError, ServiceError, StoreError};
use crate::links::{build_links, download_url, Link, LinkAction};
use crate::qr::{
    CreateOutcome, CreateQrRequest, QrService, DEFAULT_BOX_SIZE, MAX_BOX_SIZE, MIN_BOX_SIZE,
};
use crate::store::is_valid_filename;

use super::auth::{AccessToken, AuthError, Subject, TokenIssuer, TokenValidator};

// =============================================================================
// Application State
// =============================================================================

/// Values used to build responses and fill request defaults.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Public base URL of the server (e.g. `http://localhost:3000`)
    pub base_url: String,

    /// Route segment images are downloaded from
    pub download_folder: String,

    /// Fill colour used when a request omits `fill_color`
    pub fill_color: String,

    /// Background colour used when a request omits `back_color`
    pub back_color: String,
}

impl ApiSettings {
    pub fn download_url(&self, filename: &str) -> String {
        download_url(&self.base_url, &self.download_folder, filename)
    }
}

/// Shared application state passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Create/list/delete operations
    pub service: QrService,

    /// Checks bearer tokens on protected routes
    pub validator: Arc<dyn TokenValidator>,

    /// Issues tokens at `/token`
    pub issuer: Arc<dyn TokenIssuer>,

    /// Response/URL settings
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    /// Create state from a service, an authority implementing both auth
    /// capabilities, and response settings.
    pub fn new<A>(service: QrService, authority: A, settings: ApiSettings) -> Self
    where
        A: TokenValidator + TokenIssuer + 'static,
    {
        let authority = Arc::new(authority);
        Self {
            service,
            validator: authority.clone(),
            issuer: authority,
            settings: Arc::new(settings),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Body of `POST /qr-codes/`.
#[derive(Debug, Clone, Deserialize)]
pub struct QrCodeRequest {
    /// Absolute http(s) URL to encode
    pub url: String,

    /// Dark module colour (defaults to the configured fill colour)
    #[serde(default)]
    pub fill_color: Option<String>,

    /// Background colour (defaults to the configured back colour)
    #[serde(default)]
    pub back_color: Option<String>,

    /// Box size in pixels (1-20, defaults to 10)
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_size() -> i64 {
    DEFAULT_BOX_SIZE as i64
}

/// Form body of `POST /token` (OAuth2 password grant).
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub grant_type: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Per-field validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
            details: Vec::new(),
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            status: Some(status.as_u16()),
            ..Self::new(error, message)
        }
    }

    /// Attach field-level details.
    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = details;
        self
    }
}

/// A QR code as returned by create and list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCodeResponse {
    pub message: String,
    pub qr_code_url: String,
    pub links: Vec<Link>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors returned by the QR handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation (422)
    Validation(Vec<FieldError>),

    /// Request body could not be read as JSON
    Body(JsonRejection),

    /// Failure from the QR service
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

/// Convert ApiError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404 at DEBUG, other 4xx at WARN
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details = Vec::new();
        let (status, error_type, message) = match &self {
            ApiError::Validation(fields) => {
                details = fields.clone();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "validation_error",
                    "Request validation failed".to_string(),
                )
            }

            ApiError::Body(rejection) => {
                details = rejection_details(rejection);
                (rejection.status(), "invalid_body", rejection.body_text())
            }

            ApiError::Service(err) => match err {
                ServiceError::Encoding(codec_err) => {
                    details = vec![FieldError::new("url", codec_err.to_string())];
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "encoding_error",
                        format!("URL cannot be stored: {}", codec_err),
                    )
                }

                ServiceError::Store(StoreError::NotFound(filename)) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("QR code not found: {}", filename),
                ),
                ServiceError::Store(StoreError::DirectoryNotFound(_)) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "directory_not_found",
                    format!("Failed to retrieve QR codes: {}", err),
                ),
                ServiceError::Store(StoreError::PermissionDenied { .. }) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "permission_denied",
                    err.to_string(),
                ),
                ServiceError::Store(StoreError::Io { .. }) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    err.to_string(),
                ),

                ServiceError::Qr(QrError::AlreadyExists { .. }) => (
                    StatusCode::CONFLICT,
                    "conflict",
                    "QR code already exists.".to_string(),
                ),
                ServiceError::Qr(QrError::Render { .. }) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_error",
                    format!("Failed to render QR code: {}", err),
                ),
                ServiceError::Qr(QrError::EmptyPayload | QrError::PayloadTooLarge { .. }) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "encoding_failure",
                    format!("Failed to encode QR code: {}", err),
                ),
                ServiceError::Qr(QrError::Io { .. }) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    err.to_string(),
                ),

                ServiceError::Task(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    err.to_string(),
                ),
            },
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response =
            ErrorResponse::with_status(error_type, message, status).with_details(details);

        (status, Json(error_response)).into_response()
    }
}

/// Field-level detail for a JSON body that parsed but did not fit
/// [`QrCodeRequest`], e.g. a missing `url` or a non-integer `size`.
///
/// Syntax errors and wrong content types carry no field detail.
fn rejection_details(rejection: &JsonRejection) -> Vec<FieldError> {
    let JsonRejection::JsonDataError(_) = rejection else {
        return Vec::new();
    };

    let text = rejection.body_text();
    let reason = text
        .split_once("target type: ")
        .map_or(text.as_str(), |(_, reason)| reason);

    vec![FieldError::new(rejected_field(reason), reason)]
}

/// Name of the field a serde error message refers to, or `body`.
fn rejected_field(reason: &str) -> &str {
    if let Some((_, rest)) = reason.split_once("missing field `") {
        return rest.split('`').next().unwrap_or("body");
    }

    // Errors inside a field are prefixed with its path: "size: invalid type: ..."
    match reason.split_once(": ") {
        Some((path, _))
            if !path.is_empty()
                && path
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '[' | ']')) =>
        {
            path
        }
        _ => "body",
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a create request, collecting every failing field.
pub fn validate_create_request(request: &QrCodeRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&request.url) {
        Ok(parsed) => {
            if !matches!(parsed.scheme(), "http" | "https") {
                errors.push(FieldError::new("url", "URL scheme must be http or https"));
            } else if parsed.host_str().map_or(true, str::is_empty) {
                errors.push(FieldError::new("url", "URL must have a host"));
            }
        }
        Err(e) => errors.push(FieldError::new(
            "url",
            format!("invalid or missing URL scheme: {}", e),
        )),
    }

    if request.size < MIN_BOX_SIZE as i64 || request.size > MAX_BOX_SIZE as i64 {
        errors.push(FieldError::new(
            "size",
            format!(
                "size must be between {} and {}",
                MIN_BOX_SIZE, MAX_BOX_SIZE
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle QR code creation.
///
/// # Endpoint
///
/// `POST /qr-codes/`
///
/// # Response
///
/// - `201 Created`: `{message, qr_code_url, links}`
/// - `409 Conflict`: a code for this URL exists; body carries its links
/// - `422 Unprocessable Entity`: invalid URL or size
/// - `401 Unauthorized`: missing or invalid bearer token (middleware)
/// - `500 Internal Server Error`: rendering or filesystem failure
pub async fn create_qr_code_handler(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    payload: Result<Json<QrCodeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    info!(
        operation = "create",
        subject = %subject.name,
        url = %request.url,
        "Request received to generate QR code"
    );

    validate_create_request(&request).map_err(ApiError::Validation)?;

    let settings = &state.settings;
    let create = CreateQrRequest {
        url: request.url,
        fill_color: request
            .fill_color
            .unwrap_or_else(|| settings.fill_color.clone()),
        back_color: request
            .back_color
            .unwrap_or_else(|| settings.back_color.clone()),
        box_size: request.size as u32,
    };

    let outcome = state.service.create(create).await?;
    let record = outcome.record();
    let qr_code_url = settings.download_url(&record.filename);
    let links = build_links(
        LinkAction::Create,
        &record.filename,
        &settings.base_url,
        &qr_code_url,
    );

    let (status, message) = match outcome {
        CreateOutcome::Created(_) => (StatusCode::CREATED, "QR code created successfully."),
        CreateOutcome::AlreadyExists(_) => (StatusCode::CONFLICT, "QR code already exists."),
    };

    let body = QrCodeResponse {
        message: message.to_string(),
        qr_code_url,
        links,
    };

    Ok((status, Json(body)).into_response())
}

/// Handle QR code listing.
///
/// # Endpoint
///
/// `GET /qr-codes/`
///
/// # Response
///
/// `200 OK` with an array of `{message, qr_code_url, links}` where
/// `qr_code_url` is the decoded source URL and the `self` link is the image
/// download URL. Order is unspecified.
pub async fn list_qr_codes_handler(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
) -> Result<Json<Vec<QrCodeResponse>>, ApiError> {
    info!(operation = "list", subject = %subject.name, "Request received to list all QR codes");

    let records = state.service.list().await?;
    let settings = &state.settings;

    let responses = records
        .into_iter()
        .map(|record| {
            let download = settings.download_url(&record.filename);
            QrCodeResponse {
                message: "QR code available".to_string(),
                links: build_links(
                    LinkAction::List,
                    &record.filename,
                    &settings.base_url,
                    &download,
                ),
                qr_code_url: record.url,
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Handle QR code deletion.
///
/// # Endpoint
///
/// `DELETE /qr-codes/{filename}`
///
/// # Response
///
/// - `204 No Content` with a `Link: <.../qr-codes/>; rel="create"` header
/// - `404 Not Found`: no such image
pub async fn delete_qr_code_handler(
    State(state): State<AppState>,
    Extension(subject): Extension<Subject>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    info!(
        operation = "delete",
        subject = %subject.name,
        filename = %filename,
        "Request received to delete QR code"
    );

    state.service.delete(&filename).await?;

    let settings = &state.settings;
    let download = settings.download_url(&filename);
    let links = build_links(LinkAction::Delete, &filename, &settings.base_url, &download);
    let link_header = links
        .iter()
        .map(Link::to_header_value)
        .collect::<Vec<_>>()
        .join(", ");

    let mut response = StatusCode::NO_CONTENT.into_response();
    if let Ok(value) = HeaderValue::from_str(&link_header) {
        response.headers_mut().insert(header::LINK, value);
    }
    Ok(response)
}

/// Handle image downloads.
///
/// # Endpoint
///
/// `GET /{download_folder}/{filename}` (public)
///
/// # Response
///
/// - `200 OK`: the PNG, served by `tower_http`'s `ServeFile`
/// - `404 Not Found`: no such image, or a name that cannot be a stored image
///   (hidden temp files, non-`.png` files, traversal attempts)
pub async fn download_qr_code_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    if !is_valid_filename(&filename) {
        return Err(ServiceError::Store(StoreError::NotFound(filename)).into());
    }

    let path = state.service.store().path_for(&filename);
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}

/// Handle token requests (OAuth2 password grant).
///
/// # Endpoint
///
/// `POST /token` with form fields `username`, `password` and optionally
/// `grant_type=password`.
///
/// # Response
///
/// - `200 OK`: `{access_token, token_type: "bearer", expires_in}`
/// - `401 Unauthorized`: wrong credentials
/// - `400 Bad Request`: unsupported grant type
pub async fn token_handler(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<AccessToken>, AuthError> {
    if let Some(grant) = form.grant_type.as_deref() {
        if grant != "password" {
            return Err(AuthError::UnsupportedGrantType(grant.to_string()));
        }
    }

    let token = state.issuer.issue_token(&form.username, &form.password)?;
    info!(subject = %form.username, "Access token issued");
    Ok(Json(token))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
