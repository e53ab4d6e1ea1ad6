//! Server configuration loaded from the environment

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default body limit for image uploads (10 MiB)
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {0} must not be empty")]
    Empty(&'static str),
    #[error("ACCESS_SECRET_KEY and REFRESH_SECRET_KEY must differ")]
    SharedSecret,
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Process-wide configuration, read once at startup
#[derive(Clone)]
pub struct Config {
    /// HMAC secret for access tokens
    pub access_secret: String,
    /// HMAC secret for refresh tokens, distinct from `access_secret`
    pub refresh_secret: String,
    /// Postgres URL. `None` runs the server on in-memory stores.
    pub database_url: Option<String>,
    pub bind_address: SocketAddr,
    pub upload_dir: PathBuf,
    /// Prefix for URLs returned by `/upload`
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
}

// Secrets stay out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_address", &self.bind_address)
            .field("upload_dir", &self.upload_dir)
            .field("public_base_url", &self.public_base_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = required(&lookup, "ACCESS_SECRET_KEY")?;
        let refresh_secret = required(&lookup, "REFRESH_SECRET_KEY")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDRESS",
                reason: e.to_string(),
            })?;

        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/uploads"));

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    name: "MAX_UPLOAD_BYTES",
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            access_secret,
            refresh_secret,
            database_url,
            bind_address,
            upload_dir,
            public_base_url,
            max_upload_bytes,
            allowed_origins,
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or(ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}
