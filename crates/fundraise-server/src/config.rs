use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use url::Url;

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "dev-secret-change-me", "secret"];

/// Server settings, read from `FUNDRAISE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub max_upload_bytes: usize,
    pub payment_base_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("FUNDRAISE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FUNDRAISE_JWT_SECRET is unset or still a placeholder");
        }

        let port = var("FUNDRAISE_PORT", "3000")
            .parse()
            .context("FUNDRAISE_PORT must be a port number")?;
        let token_ttl_hours: i64 = var("FUNDRAISE_TOKEN_TTL_HOURS", "720")
            .parse()
            .context("FUNDRAISE_TOKEN_TTL_HOURS must be an integer")?;
        if token_ttl_hours <= 0 {
            bail!("FUNDRAISE_TOKEN_TTL_HOURS must be positive");
        }
        let max_upload_bytes = var("FUNDRAISE_MAX_UPLOAD_BYTES", "5242880") // 5 MB
            .parse()
            .context("FUNDRAISE_MAX_UPLOAD_BYTES must be an integer")?;
        let payment_base_url = var("FUNDRAISE_PAYMENT_BASE_URL", "http://localhost:3000/payments")
            .parse()
            .context("FUNDRAISE_PAYMENT_BASE_URL must be an absolute URL")?;

        Ok(Self {
            host: var("FUNDRAISE_HOST", "0.0.0.0"),
            port,
            db_path: var("FUNDRAISE_DB_PATH", "fundraise.db").into(),
            storage_dir: var("FUNDRAISE_STORAGE_DIR", "./images").into(),
            jwt_secret,
            token_ttl_hours,
            max_upload_bytes,
            payment_base_url,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}
