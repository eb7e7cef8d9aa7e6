use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub signal_source_url: String,
    pub signal_source_timeout: Duration,
    pub request_timeout: Duration,
    pub token_secret: Option<String>,
    pub database_url: Option<String>,
    pub default_fee_percent: f64,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            signal_source_url: "http://localhost:8000".to_string(),
            signal_source_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            token_secret: None,
            database_url: None,
            default_fee_percent: 0.1,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or blank variables take
    /// the default; set-but-invalid numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let bind_addr = match var("BIND_ADDR") {
            Some(v) => v
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {}", v))?,
            None => defaults.bind_addr,
        };

        let signal_source_timeout = match var("SIGNAL_SOURCE_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("SIGNAL_SOURCE_TIMEOUT_SECS is not a number: {}", v))?,
            ),
            None => defaults.signal_source_timeout,
        };

        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("REQUEST_TIMEOUT_SECS is not a number: {}", v))?,
            ),
            None => defaults.request_timeout,
        };

        let default_fee_percent = match var("DEFAULT_FEE_PERCENT") {
            Some(v) => v
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .with_context(|| format!("DEFAULT_FEE_PERCENT is not a number: {}", v))?,
            None => defaults.default_fee_percent,
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            bind_addr,
            signal_source_url: var("SIGNAL_SOURCE_URL").unwrap_or(defaults.signal_source_url),
            signal_source_timeout,
            request_timeout,
            token_secret: var("TOKEN_SECRET"),
            database_url: var("DATABASE_URL"),
            default_fee_percent,
            cors_allowed_origins,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.signal_source_timeout.is_zero() {
            anyhow::bail!("SIGNAL_SOURCE_TIMEOUT_SECS must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if self.token_secret.as_ref().is_some_and(|s| s.len() < 16) {
            tracing::warn!("TOKEN_SECRET is shorter than 16 bytes");
        }
        Ok(())
    }
}
