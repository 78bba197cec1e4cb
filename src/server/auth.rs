//! Bearer token authentication for the QR API.
//!
//! This module implements the OAuth2 password flow used by the API:
//! clients exchange a username and password at `POST /token` for a signed,
//! time-limited JWT and present it as `Authorization: Bearer <token>` on
//! every `/qr-codes` request.
//!
//! # Capabilities
//!
//! The HTTP layer only depends on two traits:
//!
//! - [`TokenIssuer`]: `issue_token(username, password) -> AccessToken`
//! - [`TokenValidator`]: `validate_bearer_token(token) -> Subject`
//!
//! [`JwtAuthority`] implements both with `jsonwebtoken`, signing with a shared
//! secret and an HMAC algorithm (`HS256`, `HS384` or `HS512`).
//!
//! # Example
//!
//! ```rust
//! use qr_code_manager::server::auth::{JwtAuthority, TokenIssuer, TokenValidator};
//!
//! let authority = JwtAuthority::new("my-secret-key", "admin", "secret");
//! let token = authority.issue_token("admin", "secret").unwrap();
//!
//! let subject = authority.validate_bearer_token(&token.access_token).unwrap();
//! assert_eq!(subject.name, "admin");
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

/// Default access token lifetime.
pub const DEFAULT_TOKEN_EXPIRE_MINUTES: u64 = 30;

/// Token type reported by the token endpoint.
pub const TOKEN_TYPE_BEARER: &str = "bearer";

// =============================================================================
// Types
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header
    MissingToken,

    /// Header present but not `Bearer <token>`
    InvalidScheme,

    /// Token is malformed, signed with another key or algorithm
    InvalidToken,

    /// Token signature is fine but it is past its expiry
    Expired,

    /// Username or password did not match
    InvalidCredentials,

    /// `grant_type` other than `password`
    UnsupportedGrantType(String),

    /// Signing a new token failed
    Signing(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Not authenticated"),
            AuthError::InvalidScheme => {
                write!(f, "Invalid Authorization format. Expected: Bearer <token>")
            }
            AuthError::InvalidToken => write!(f, "Could not validate credentials"),
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::InvalidCredentials => write!(f, "Incorrect username or password"),
            AuthError::UnsupportedGrantType(grant) => {
                write!(f, "Unsupported grant type: {}", grant)
            }
            AuthError::Signing(msg) => write!(f, "Failed to sign token: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "not_authenticated"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "invalid_scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthError::Expired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::UnsupportedGrantType(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_grant_type")
            }
            AuthError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "token_signing_failed"),
        };
        let message = self.to_string();

        // Bad tokens and bad passwords may be probing, expired tokens are routine
        match &self {
            AuthError::InvalidToken | AuthError::InvalidCredentials => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            AuthError::Signing(_) => {
                tracing::error!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
            _ => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Authentication failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        let mut response = (status, Json(error_response)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// The authenticated principal behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
}

/// Successful token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// Issued-at (Unix seconds)
    pub iat: u64,
    /// Expiry (Unix seconds)
    pub exp: u64,
}

// =============================================================================
// Capabilities
// =============================================================================

/// Checks bearer tokens presented on protected requests.
pub trait TokenValidator: Send + Sync {
    fn validate_bearer_token(&self, token: &str) -> Result<Subject, AuthError>;
}

/// Exchanges credentials for bearer tokens.
pub trait TokenIssuer: Send + Sync {
    fn issue_token(&self, username: &str, password: &str) -> Result<AccessToken, AuthError>;
}

// =============================================================================
// JWT Authority
// =============================================================================

/// Issues and validates HMAC-signed JWTs for a single bootstrap user.
#[derive(Clone)]
pub struct JwtAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
    username: String,
    password: String,
}

impl JwtAuthority {
    /// Create an authority using `HS256` and a 30 minute token lifetime.
    pub fn new(
        secret: impl AsRef<[u8]>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            ttl: Duration::from_secs(DEFAULT_TOKEN_EXPIRE_MINUTES * 60),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Use another HMAC algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `subject` expiring at `exp` (Unix seconds).
    pub fn sign_with_expiry(&self, subject: &str, exp: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now_secs(),
            exp,
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn credentials_match(&self, username: &str, password: &str) -> bool {
        let user_ok: bool = username.as_bytes().ct_eq(self.username.as_bytes()).into();
        let pass_ok: bool = password.as_bytes().ct_eq(self.password.as_bytes()).into();
        user_ok & pass_ok
    }
}

impl std::fmt::Debug for JwtAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthority")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer for JwtAuthority {
    fn issue_token(&self, username: &str, password: &str) -> Result<AccessToken, AuthError> {
        if !self.credentials_match(username, password) {
            return Err(AuthError::InvalidCredentials);
        }

        let expires_in = self.ttl.as_secs();
        let access_token = self.sign_with_expiry(username, now_secs() + expires_in)?;
        debug!(subject = username, expires_in = expires_in, "Issued access token");

        Ok(AccessToken {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in,
        })
    }
}

impl TokenValidator for JwtAuthority {
    fn validate_bearer_token(&self, token: &str) -> Result<Subject, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;

        Ok(Subject {
            name: data.claims.sub,
        })
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or(AuthError::InvalidScheme)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidScheme);
    }
    Ok(token)
}

/// Axum middleware rejecting requests without a valid bearer token.
///
/// On success the [`Subject`] is stored in the request extensions.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use qr_code_manager::server::auth::{JwtAuthority, bearer_auth_middleware};
///
/// let validator: Arc<dyn TokenValidator> = Arc::new(JwtAuthority::new("secret", "admin", "pw"));
/// let app = Router::new()
///     .route("/qr-codes/", get(list_qr_codes_handler))
///     .layer(middleware::from_fn_with_state(validator, bearer_auth_middleware));
/// ```
pub async fn bearer_auth_middleware(
    State(validator): State<Arc<dyn TokenValidator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let token = bearer_token(header_value)?;
    let subject = validator.validate_bearer_token(token)?;
    debug!(subject = %subject.name, "Bearer token accepted");

    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
