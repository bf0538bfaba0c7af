use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const DEV_JWT_SECRET: &str = "dev-only-secret-change-me";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub model_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Reads configuration from the process environment. Call `dotenv::dotenv()` first
    /// to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let jwt_secret = match lookup("JWT_SECRET").filter(|v| !v.is_empty()) {
            Some(secret) => secret,
            None if cfg!(debug_assertions) => {
                warn!("JWT_SECRET is not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "MAX_UPLOAD_BYTES",
                    reason: format!("expected a positive integer, got {:?}", raw),
                })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let cors_origins = get(
            "CORS_ORIGINS",
            "http://localhost:5173,http://127.0.0.1:5173",
        )
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

        Ok(Self {
            bind_addr: get("BIND_ADDR", "127.0.0.1:5000"),
            database_url: get("DATABASE_URL", "sqlite://data.db?mode=rwc"),
            jwt_secret,
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "uploads")),
            model_dir: PathBuf::from(get("MODEL_DIR", "models")),
            cors_origins,
            max_upload_bytes,
        })
    }
}
