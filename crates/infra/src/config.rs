//! Runtime configuration read from environment variables.
//!
//! `from_env` reads the process environment; `from_lookup` takes any lookup
//! function so tests can supply variables without touching the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cas::DEFAULT_MAX_ATTEMPTS;
use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits};
use crate::store::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockroomConfig {
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Read-modify-write attempts per stock adjustment or update.
    pub stock_max_attempts: u32,
    pub store_retry: RetryPolicy,
    pub page_limits: PageLimits,
}

impl Default for StockroomConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8001,
            stock_max_attempts: DEFAULT_MAX_ATTEMPTS,
            store_retry: RetryPolicy::default(),
            page_limits: PageLimits::default(),
        }
    }
}

impl StockroomConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let stock_max_attempts = parse_or(&get, "STOCK_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if stock_max_attempts == 0 {
            return Err(ConfigError::invalid(
                "STOCK_MAX_ATTEMPTS",
                "0",
                "must be at least 1",
            ));
        }

        let base_delay_ms = parse_or(&get, "STORE_RETRY_BASE_DELAY_MS", 50u64)?;
        let max_delay_ms = parse_or(&get, "STORE_RETRY_MAX_DELAY_MS", 1_000u64)?;
        let store_retry = RetryPolicy::exponential(
            parse_or(&get, "STORE_RETRY_MAX_ATTEMPTS", defaults.store_retry.max_attempts)?,
            Duration::from_millis(base_delay_ms),
            Duration::from_millis(max_delay_ms.max(base_delay_ms)),
        );

        let default_page_size = parse_or(&get, "DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let max_page_size = parse_or(&get, "MAX_PAGE_SIZE", MAX_PAGE_SIZE)?;
        if max_page_size == 0 {
            return Err(ConfigError::invalid("MAX_PAGE_SIZE", "0", "must be at least 1"));
        }
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(ConfigError::invalid(
                "DEFAULT_PAGE_SIZE",
                &default_page_size.to_string(),
                format!("must be between 1 and MAX_PAGE_SIZE ({max_page_size})"),
            ));
        }

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            port: parse_or(&get, "PORT", defaults.port)?,
            stock_max_attempts,
            store_retry,
            page_limits: PageLimits {
                default_page_size,
                max_page_size,
            },
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, &raw, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = StockroomConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StockroomConfig::default());
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:8001");
    }

    #[test]
    fn values_are_read_from_lookup() {
        let config = StockroomConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/stockroom"),
            ("PORT", "9000"),
            ("BIND_ADDR", "127.0.0.1"),
            ("STOCK_MAX_ATTEMPTS", "8"),
            ("STORE_RETRY_MAX_ATTEMPTS", "0"),
            ("MAX_PAGE_SIZE", "50"),
            ("DEFAULT_PAGE_SIZE", "25"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/stockroom")
        );
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.stock_max_attempts, 8);
        assert_eq!(config.store_retry.max_attempts, 0);
        assert_eq!(config.page_limits.default_page_size, 25);
        assert_eq!(config.page_limits.max_page_size, 50);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = StockroomConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = StockroomConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        match err {
            ConfigError::Invalid { var, value, .. } => {
                assert_eq!(var, "PORT");
                assert_eq!(value, "eighty");
            }
        }
    }

    #[test]
    fn zero_attempts_are_rejected() {
        assert!(StockroomConfig::from_lookup(lookup(&[("STOCK_MAX_ATTEMPTS", "0")])).is_err());
    }

    #[test]
    fn default_page_size_must_fit_the_maximum() {
        assert!(
            StockroomConfig::from_lookup(lookup(&[
                ("DEFAULT_PAGE_SIZE", "200"),
                ("MAX_PAGE_SIZE", "100"),
            ]))
            .is_err()
        );
    }
}
