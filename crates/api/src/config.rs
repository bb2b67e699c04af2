use std::str::FromStr;

use airmail_core::execution::{EngineLimits, DEFAULT_PAGE_SIZE, DEFAULT_WRITE_BATCH_SIZE};
use axum::http::HeaderValue;

/// A configuration variable that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Timeout for ordinary requests in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on a single rule execution in seconds (default: `300`).
    pub rule_execution_timeout_secs: u64,
    /// Time allowed for in-flight requests to drain on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Page and write-batch sizes handed to the engines.
    pub engine_limits: EngineLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            rule_execution_timeout_secs: 300,
            shutdown_timeout_secs: 30,
            engine_limits: EngineLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `RULE_EXECUTION_TIMEOUT_SECS` | `300`                   |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `RECORD_PAGE_SIZE`            | `1000`                  |
    /// | `WRITE_BATCH_SIZE`            | `2000`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let cors_origins = match std::env::var("CORS_ORIGINS") {
            Ok(raw) => parse_origins(&raw)?,
            Err(_) => defaults.cors_origins,
        };

        let page_size: i64 = env_or("RECORD_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let write_batch_size: usize = env_or("WRITE_BATCH_SIZE", DEFAULT_WRITE_BATCH_SIZE)?;
        if page_size < 1 {
            return Err(ConfigError::Invalid {
                var: "RECORD_PAGE_SIZE",
                value: page_size.to_string(),
            });
        }
        if write_batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "WRITE_BATCH_SIZE",
                value: "0".into(),
            });
        }

        Ok(Self {
            host,
            port: env_or("PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            rule_execution_timeout_secs: env_or(
                "RULE_EXECUTION_TIMEOUT_SECS",
                defaults.rule_execution_timeout_secs,
            )?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout_secs)?,
            engine_limits: EngineLimits {
                page_size,
                write_batch_size,
            },
        })
    }
}

fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated origin list, rejecting values that are not valid
/// header values.
pub fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map(|_| origin.to_string())
                .map_err(|_| ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    value: origin.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        let origins = parse_origins(" http://a.test , ,http://b.test").unwrap();
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn origin_with_control_characters_is_rejected() {
        let err = parse_origins("http://ok.test,bad\norigin").unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "CORS_ORIGINS", .. });
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rule_execution_timeout_secs, 300);
        assert_eq!(config.engine_limits.page_size, 1_000);
        assert_eq!(config.engine_limits.write_batch_size, 2_000);
    }
}
