use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Longest accepted session lifetime, one year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Secrets from sample `.env` files that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "it's a secret",
];

#[derive(Debug)]
pub struct Config {
    pub secret_key: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub session_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let secret_key = var("WARBLER_SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("WARBLER_SECRET_KEY is unset or still a placeholder; set it in your .env file");
        }

        let db_path = var("WARBLER_DB_PATH").unwrap_or_else(|| "warbler.db".into()).into();
        let host = var("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("WARBLER_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("WARBLER_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;
        let session_ttl_hours = match var("WARBLER_SESSION_TTL_HOURS") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
                .with_context(|| {
                    format!("WARBLER_SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}")
                })?,
            None => 168, // 7 days
        };

        Ok(Self {
            secret_key,
            db_path,
            addr,
            session_ttl_hours,
        })
    }

    pub fn session_ttl(&self) -> anyhow::Result<chrono::Duration> {
        chrono::Duration::try_hours(self.session_ttl_hours).context("session lifetime out of range")
    }

    pub fn in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("WARBLER_SECRET_KEY", "s3cr3t")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("warbler.db"));
        assert_eq!(config.addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.session_ttl_hours, 168);
        assert!(!config.in_memory());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("WARBLER_SECRET_KEY", "s3cr3t"),
            ("WARBLER_DB_PATH", ":memory:"),
            ("WARBLER_HOST", "127.0.0.1"),
            ("WARBLER_PORT", "8080"),
            ("WARBLER_SESSION_TTL_HOURS", "2"),
        ])
        .unwrap();
        assert!(config.in_memory());
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.session_ttl_hours, 2);
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(load(&[]).is_err());
        assert!(load(&[("WARBLER_SECRET_KEY", "dev-secret-change-me")]).is_err());
        assert!(load(&[("WARBLER_SECRET_KEY", "it's a secret")]).is_err());
    }

    #[test]
    fn session_lifetime_is_bounded() {
        let secret = ("WARBLER_SECRET_KEY", "s3cr3t");
        for bad in ["0", "-5", "hours", "9223372036854775807", "8761"] {
            assert!(
                load(&[secret, ("WARBLER_SESSION_TTL_HOURS", bad)]).is_err(),
                "{bad} accepted"
            );
        }

        let config = load(&[secret, ("WARBLER_SESSION_TTL_HOURS", "8760")]).unwrap();
        assert_eq!(config.session_ttl().unwrap(), chrono::Duration::hours(8760));
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(load(&[("WARBLER_SECRET_KEY", "s3cr3t"), ("WARBLER_PORT", "http")]).is_err());
    }
}
