/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `API_PRODUCTION`: Production mode flag (default: false)
/// - `DATABASE_URL`: SQLite connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `CAPTCHA_SECRET_KEY`: CAPTCHA provider secret (without it every check fails)
/// - `CAPTCHA_VERIFY_URL`: CAPTCHA verification endpoint
/// - `EMAIL_API_URL`, `EMAIL_API_KEY`, `EMAIL_FROM`, `NOTIFY_EMAIL_TO`: staff
///   notifications (disabled unless URL and recipient are set)
/// - `CRM_API_URL`, `CRM_API_KEY`: CRM sync (disabled unless URL is set)
/// - `INTEGRATION_TIMEOUT_SECS`: Timeout for outbound HTTP calls (default: 10)
/// - `UPLOAD_DIR`: Local directory for uploaded files (default: ./uploads)
/// - `UPLOAD_MAX_BYTES`: Upload size limit (default: 10 MiB)
/// - `RUST_LOG`: Log level (default: debug for the Brightline crates)
///
/// # Example
///
/// ```no_run
/// use brightline_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use brightline_shared::security::captcha::DEFAULT_VERIFY_URL;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default upload size limit (10 MiB)
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// External collaborators
    pub integrations: IntegrationsConfig,

    /// Upload handling
    pub uploads: UploadConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,

    /// Production mode
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// External collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    /// CAPTCHA provider secret; None means every check fails
    pub captcha_secret: Option<String>,

    pub captcha_verify_url: String,

    /// Transactional email API endpoint
    pub email_api_url: Option<String>,

    pub email_api_key: Option<String>,

    /// Sender address for staff notifications
    pub email_from: String,

    /// Staff inbox that receives form notifications
    pub notify_email_to: Option<String>,

    /// CRM API base URL
    pub crm_api_url: Option<String>,

    pub crm_api_key: Option<String>,

    /// Timeout for every outbound HTTP call (seconds)
    pub timeout_seconds: u64,
}

/// Upload handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Root directory of the local object store
    pub dir: PathBuf,

    /// Largest accepted file, in bytes
    pub max_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    ///
    /// # Example
    ///
    /// ```no_run
    /// use brightline_api::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_env()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_env() -> anyhow::Result<Self> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let cors_origins = env::var("API_CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = env::var("API_PRODUCTION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let timeout_seconds = env::var("INTEGRATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()?;

        let upload_max_bytes = match env::var("UPLOAD_MAX_BYTES") {
            Ok(v) => v.parse::<usize>()?,
            Err(_) => DEFAULT_UPLOAD_MAX_BYTES,
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
            },
            integrations: IntegrationsConfig {
                captcha_secret: optional_var("CAPTCHA_SECRET_KEY"),
                captcha_verify_url: env::var("CAPTCHA_VERIFY_URL")
                    .unwrap_or_else(|_| DEFAULT_VERIFY_URL.to_string()),
                email_api_url: optional_var("EMAIL_API_URL"),
                email_api_key: optional_var("EMAIL_API_KEY"),
                email_from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "no-reply@brightline.example".to_string()),
                notify_email_to: optional_var("NOTIFY_EMAIL_TO"),
                crm_api_url: optional_var("CRM_API_URL"),
                crm_api_key: optional_var("CRM_API_KEY"),
                timeout_seconds,
            },
            uploads: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "./uploads".to_string())
                    .into(),
                max_bytes: upload_max_bytes,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Configuration for tests and local tooling
    ///
    /// Every external collaborator is unset.
    pub fn for_testing(jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            integrations: IntegrationsConfig {
                captcha_secret: None,
                captcha_verify_url: DEFAULT_VERIFY_URL.to_string(),
                email_api_url: None,
                email_api_key: None,
                email_from: "no-reply@brightline.example".to_string(),
                notify_email_to: None,
                crm_api_url: None,
                crm_api_key: None,
                timeout_seconds: 10,
            },
            uploads: UploadConfig {
                dir: "./uploads".into(),
                max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            },
        }
    }
}

/// Reads a variable, treating empty values as unset
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
