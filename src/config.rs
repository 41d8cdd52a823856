use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Process-wide configuration, loaded once at startup. The token signing
/// secret is injected here rather than living anywhere in source.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub token_secret: String,
    pub token_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let token_secret = env::var("TOKEN_SECRET").context("TOKEN_SECRET must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let token_ttl_minutes = match env::var("TOKEN_TTL_MINUTES") {
            Ok(raw) => raw
                .parse::<i64>()
                .context("TOKEN_TTL_MINUTES must be an integer number of minutes")?,
            Err(_) => DEFAULT_TOKEN_TTL_MINUTES,
        };

        Ok(Config {
            database_url,
            bind_addr,
            token_secret,
            token_ttl_minutes,
        })
    }
}
