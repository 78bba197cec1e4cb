//! Configuration management for the QR code manager.
//!
//! Settings come from command-line flags, environment variables (a `.env`
//! file is loaded first by the binary) and defaults, in that order of
//! precedence.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use qr_code_manager::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `QR_HOST` - Server bind address (default: 0.0.0.0)
//! - `QR_PORT` - Server port (default: 3000)
//! - `QR_CODE_DIR` - Directory QR images are stored in (default: ./qr_codes)
//! - `QR_FILL_COLOR` - Default module colour (default: red)
//! - `QR_BACK_COLOR` - Default background colour (default: white)
//! - `QR_SERVER_BASE_URL` - Public base URL for links (default: http://localhost:3000)
//! - `QR_SERVER_DOWNLOAD_FOLDER` - Route segment for image downloads (default: downloads)
//! - `QR_SECRET_KEY` - JWT signing secret (required)
//! - `QR_ALGORITHM` - JWT algorithm: HS256, HS384 or HS512 (default: HS256)
//! - `QR_ACCESS_TOKEN_EXPIRE_MINUTES` - Token lifetime (default: 30)
//! - `QR_ADMIN_USER` / `QR_ADMIN_PASSWORD` - Bootstrap credentials (default: admin / secret)
//! - `QR_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use jsonwebtoken::Algorithm;

use crate::server::auth::DEFAULT_TOKEN_EXPIRE_MINUTES;
use crate::server::routes::{
    validate_download_folder, DEFAULT_BACK_COLOR, DEFAULT_DOWNLOAD_FOLDER, DEFAULT_FILL_COLOR,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default QR image directory.
pub const DEFAULT_QR_DIRECTORY: &str = "./qr_codes";

/// Default public base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default JWT algorithm.
pub const DEFAULT_ALGORITHM: &str = "HS256";

/// Default bootstrap user.
pub const DEFAULT_ADMIN_USER: &str = "admin";

/// Default bootstrap password.
pub const DEFAULT_ADMIN_PASSWORD: &str = "secret";

// =============================================================================
// CLI Arguments
// =============================================================================

/// QR Code Manager - create, list and delete QR code images over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "qr-code-manager")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "QR_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "QR_PORT")]
    pub port: u16,

    /// Public base URL used to build download URLs and links.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "QR_SERVER_BASE_URL")]
    pub base_url: String,

    /// Route segment images are downloaded from.
    #[arg(long, default_value = DEFAULT_DOWNLOAD_FOLDER, env = "QR_SERVER_DOWNLOAD_FOLDER")]
    pub download_folder: String,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory QR images are stored in. Created at startup if missing.
    #[arg(long, default_value = DEFAULT_QR_DIRECTORY, env = "QR_CODE_DIR")]
    pub qr_directory: PathBuf,

    // =========================================================================
    // Rendering Configuration
    // =========================================================================
    /// Default colour of QR modules.
    #[arg(long, default_value = DEFAULT_FILL_COLOR, env = "QR_FILL_COLOR")]
    pub fill_color: String,

    /// Default background colour.
    #[arg(long, default_value = DEFAULT_BACK_COLOR, env = "QR_BACK_COLOR")]
    pub back_color: String,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key used to sign access tokens.
    ///
    /// The server refuses to start without it.
    #[arg(long, env = "QR_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// JWT signing algorithm (HS256, HS384, HS512).
    #[arg(long, default_value = DEFAULT_ALGORITHM, env = "QR_ALGORITHM")]
    pub algorithm: String,

    /// Access token lifetime in minutes.
    #[arg(long, default_value_t = DEFAULT_TOKEN_EXPIRE_MINUTES, env = "QR_ACCESS_TOKEN_EXPIRE_MINUTES")]
    pub token_expire_minutes: u64,

    /// Username accepted at the token endpoint.
    #[arg(long, default_value = DEFAULT_ADMIN_USER, env = "QR_ADMIN_USER")]
    pub admin_user: String,

    /// Password accepted at the token endpoint.
    #[arg(long, default_value = DEFAULT_ADMIN_PASSWORD, env = "QR_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "QR_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret_key.as_deref().map_or(true, str::is_empty) {
            return Err(
                "SECRET_KEY is not set. Set --secret-key or QR_SECRET_KEY (e.g. in a .env file)"
                    .to_string(),
            );
        }

        self.jwt_algorithm()?;

        if self.token_expire_minutes == 0 {
            return Err("token_expire_minutes must be greater than 0".to_string());
        }

        if self.admin_user.is_empty() {
            return Err("admin_user must not be empty".to_string());
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(format!(
                    "base_url must be an absolute http(s) URL, got '{}'",
                    self.base_url
                ))
            }
        }

        validate_download_folder(&self.download_folder)?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse the configured JWT algorithm. Only HMAC algorithms are accepted
    /// since tokens are signed with a shared secret.
    pub fn jwt_algorithm(&self) -> Result<Algorithm, String> {
        let algorithm = Algorithm::from_str(&self.algorithm.to_ascii_uppercase())
            .map_err(|_| format!("Unknown JWT algorithm: {}", self.algorithm))?;
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(format!(
                "Unsupported JWT algorithm {:?}: only HS256, HS384 and HS512 are allowed",
                other
            )),
        }
    }

    /// Token lifetime as a duration.
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_expire_minutes * 60)
    }

    /// Get the secret key, or an empty string if unset (call validate() first).
    pub fn secret_key_or_empty(&self) -> &str {
        self.secret_key.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Tests
// =============================================================================
