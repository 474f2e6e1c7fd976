use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use time::UtcOffset;

use crate::date_key::parse_offset;

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub interpreter: InterpreterConfig,
    /// The user's offset; `None` means "whatever the host says".
    pub utc_offset: Option<UtcOffset>,
    /// Chat sessions idle for longer than this are dropped.
    pub chat_session_ttl: Duration,
    pub listen_addr: SocketAddr,
}

fn positive_secs(name: &str, raw: Option<String>, default: u64) -> anyhow::Result<Duration> {
    let secs = match raw {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .with_context(|| format!("{name} must be a positive integer, got '{v}'"))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Reads values through `get` so tests don't touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> anyhow::Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let database_url =
            get("DATABASE_URL").unwrap_or_else(|| "sqlite://macro_tracker.db".into());
        let interpreter = InterpreterConfig {
            url: get("INTERPRETER_URL").unwrap_or_else(|| "http://127.0.0.1:5000/api/chat".into()),
            timeout: positive_secs("INTERPRETER_TIMEOUT_SECS", get("INTERPRETER_TIMEOUT_SECS"), 30)?,
        };
        let chat_session_ttl = positive_secs("CHAT_SESSION_TTL_SECS", get("CHAT_SESSION_TTL_SECS"), 3600)?;
        let utc_offset = match get("APP_UTC_OFFSET") {
            Some(v) => Some(parse_offset(&v).context("APP_UTC_OFFSET")?),
            None => None,
        };
        let host = get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = get("APP_PORT").unwrap_or_else(|| "8080".into());
        let listen_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .with_context(|| format!("APP_HOST/APP_PORT do not form an address: '{host}:{port}'"))?;
        Ok(Self {
            database_url,
            interpreter,
            utc_offset,
            chat_session_ttl,
            listen_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::offset;

    #[test]
    fn defaults_when_unset() {
        let cfg = AppConfig::from_env_with(|_| None).expect("cfg");
        assert_eq!(cfg.database_url, "sqlite://macro_tracker.db");
        assert_eq!(cfg.interpreter.url, "http://127.0.0.1:5000/api/chat");
        assert_eq!(cfg.interpreter.timeout, Duration::from_secs(30));
        assert_eq!(cfg.utc_offset, None);
        assert_eq!(cfg.chat_session_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.listen_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn reads_values() {
        let get = |k: &str| match k {
            "DATABASE_URL" => Some("sqlite::memory:".into()),
            "INTERPRETER_URL" => Some("http://interp.local/api/chat".into()),
            "INTERPRETER_TIMEOUT_SECS" => Some("5".into()),
            "APP_UTC_OFFSET" => Some("+05:30".into()),
            "CHAT_SESSION_TTL_SECS" => Some("600".into()),
            "APP_HOST" => Some("127.0.0.1".into()),
            "APP_PORT" => Some("9000".into()),
            _ => None,
        };
        let cfg = AppConfig::from_env_with(get).expect("cfg");
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.interpreter.url, "http://interp.local/api/chat");
        assert_eq!(cfg.interpreter.timeout, Duration::from_secs(5));
        assert_eq!(cfg.utc_offset, Some(offset!(+5:30)));
        assert_eq!(cfg.chat_session_ttl, Duration::from_secs(600));
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn rejects_malformed_values() {
        let bad_timeout = |k: &str| (k == "INTERPRETER_TIMEOUT_SECS").then(|| "soon".to_string());
        assert!(AppConfig::from_env_with(bad_timeout).is_err());

        let zero_timeout = |k: &str| (k == "INTERPRETER_TIMEOUT_SECS").then(|| "0".to_string());
        assert!(AppConfig::from_env_with(zero_timeout).is_err());

        let zero_ttl = |k: &str| (k == "CHAT_SESSION_TTL_SECS").then(|| "0".to_string());
        assert!(AppConfig::from_env_with(zero_ttl).is_err());

        let bad_port = |k: &str| (k == "APP_PORT").then(|| "http".to_string());
        assert!(AppConfig::from_env_with(bad_port).is_err());

        let bad_offset = |k: &str| (k == "APP_UTC_OFFSET").then(|| "IST".to_string());
        let err = AppConfig::from_env_with(bad_offset).unwrap_err();
        assert!(format!("{err:#}").contains("APP_UTC_OFFSET"));
    }
}
