use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

/// Placeholder JWT secrets that must not reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("SKILLSWAP_JWT_SECRET").unwrap_or_else(|| DEV_SECRET.into());
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("SKILLSWAP_JWT_SECRET must not be empty");
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("SKILLSWAP_JWT_SECRET is unset or a placeholder; tokens are forgeable");
        }

        let db_path: PathBuf = get("SKILLSWAP_DB_PATH")
            .unwrap_or_else(|| "skillswap.db".into())
            .into();
        let host = get("SKILLSWAP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("SKILLSWAP_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("SKILLSWAP_PORT must be a port number")?;
        let token_ttl_days: i64 = get("SKILLSWAP_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("SKILLSWAP_TOKEN_TTL_DAYS must be an integer")?;
        if token_ttl_days <= 0 {
            anyhow::bail!("SKILLSWAP_TOKEN_TTL_DAYS must be positive");
        }

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.jwt_secret, DEV_SECRET);
        assert_eq!(config.db_path, PathBuf::from("skillswap.db"));
        assert_eq!(config.addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.token_ttl_days, 30);
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("SKILLSWAP_JWT_SECRET", "s3cret"),
            ("SKILLSWAP_HOST", "127.0.0.1"),
            ("SKILLSWAP_PORT", "8080"),
            ("SKILLSWAP_TOKEN_TTL_DAYS", "7"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.token_ttl_days, 7);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(Config::from_lookup(lookup(&[("SKILLSWAP_PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SKILLSWAP_TOKEN_TTL_DAYS", "0")])).is_err());
    }

    #[test]
    fn blank_secret_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("SKILLSWAP_JWT_SECRET", "")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SKILLSWAP_JWT_SECRET", "  \t")])).is_err());
    }
}
