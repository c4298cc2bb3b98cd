//! Configuration management for the API server
//!
//! Configuration is built once in `main` from environment variables (and an
//! optional `.env` file) and shared with handlers through `AppState`.
//!
//! # Environment Variables
//!
//! - `HOST`: Host to bind to (default: 0.0.0.0)
//! - `PORT`: Port to bind to (default: 3000)
//! - `APP_ENV`: Deployment environment (default: production)
//! - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
//! - `APP_ROOT`: Base directory for relative defaults (default: current directory)
//! - `DATA_DIR`: Directory holding `db.json` (default: `{APP_ROOT}/data`)
//! - `PUBLIC_DIR`: Static site root (default: `{APP_ROOT}/public`)
//! - `UPLOADS_DIR`: Stored attachments (default: `{PUBLIC_DIR}/uploads`)
//! - `TMP_UPLOADS_DIR`: Staging area for uploads (default: `{APP_ROOT}/tmp_uploads`)
//! - `MAX_UPLOAD_BYTES`: Request body cap (default: 50 MiB)
//! - `JWT_SECRET`: Secret key for token signing (default: a development value)
//! - `JWT_EXPIRY_HOURS`: Token lifetime (default: 168)
//! - `HASH_MEMORY_KIB`, `HASH_ITERATIONS`, `HASH_PARALLELISM`: Argon2id cost
//! - `RUST_LOG`: Log filter (read by the tracing subscriber, not here)
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use taskdesk_shared::auth::{jwt::DEFAULT_TOKEN_TTL_HOURS, password::HashParams};

/// Secret used when `JWT_SECRET` is unset. Never acceptable in production.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// File name of the JSON document inside the data directory
pub const DOCUMENT_FILE: &str = "db.json";

/// Default request body cap (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Filesystem layout
    pub storage: StorageConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Argon2id cost used for new password hashes
    pub password: HashParams,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Deployment environment name, reported by the health endpoint
    pub env: String,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON document
    pub data_dir: PathBuf,

    /// Static site root
    pub public_dir: PathBuf,

    /// Where stored attachments live, served under `/uploads`
    pub uploads_dir: PathBuf,

    /// Staging area for in-flight uploads
    pub tmp_uploads_dir: PathBuf,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in hours
    pub expiry_hours: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or the result
    /// fails [`Config::validate`].
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse::<usize>()?;

        let app_root = match env::var("APP_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => env::current_dir()?,
        };
        let data_dir = env_path("DATA_DIR").unwrap_or_else(|| app_root.join("data"));
        let public_dir = env_path("PUBLIC_DIR").unwrap_or_else(|| app_root.join("public"));
        let uploads_dir = env_path("UPLOADS_DIR").unwrap_or_else(|| public_dir.join("uploads"));
        let tmp_uploads_dir = env_path("TMP_UPLOADS_DIR").unwrap_or_else(|| app_root.join("tmp_uploads"));

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET is not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };
        let expiry_hours = env::var("JWT_EXPIRY_HOURS")
            .unwrap_or_else(|_| DEFAULT_TOKEN_TTL_HOURS.to_string())
            .parse::<i64>()?;

        let defaults = HashParams::default();
        let password = HashParams {
            memory_kib: env_number("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_number("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: env_number("HASH_PARALLELISM", defaults.parallelism)?,
        };

        let config = Self {
            api: ApiConfig {
                host,
                port,
                env: app_env,
                cors_origins,
                max_upload_bytes,
            },
            storage: StorageConfig {
                data_dir,
                public_dir,
                uploads_dir,
                tmp_uploads_dir,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiry_hours,
            },
            password,
        };
        config.validate()?;

        Ok(config)
    }

    /// Rejects settings the server could not run with
    ///
    /// # Errors
    ///
    /// Fails on a non-positive token lifetime or hash parameters argon2
    /// refuses.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt.expiry_hours <= 0 {
            anyhow::bail!("JWT_EXPIRY_HOURS must be positive");
        }
        if let Err(e) = self.password.validate() {
            anyhow::bail!("HASH_MEMORY_KIB/HASH_ITERATIONS/HASH_PARALLELISM rejected: {}", e);
        }

        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Returns the path of the JSON document
    pub fn document_path(&self) -> PathBuf {
        self.storage.data_dir.join(DOCUMENT_FILE)
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        self.api.env == "production"
    }

    /// Token lifetime as a duration
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.expiry_hours)
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn env_number(key: &str, default: u32) -> anyhow::Result<u32> {
    match env::var(key) {
        Ok(value) => Ok(value.parse::<u32>()?),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

impl StorageConfig {
    /// Lays out every directory under a single root
    pub fn under(root: &Path) -> Self {
        let public_dir = root.join("public");
        Self {
            data_dir: root.join("data"),
            uploads_dir: public_dir.join("uploads"),
            public_dir,
            tmp_uploads_dir: root.join("tmp_uploads"),
        }
    }
}
