//! Service configuration loaded once from environment variables.

use std::env;
use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use crate::schedule::{default_periods, PeriodDefinition};

const DEV_SECRET_KEY: &str = "change_me_in_production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must be set outside the dev environment")]
    Missing(&'static str),
}

/// SMTP relay settings. Absent host means mails are only logged.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
}

/// Immutable application configuration, shared through the app state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_env: String,
    pub secret_key: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub database_path: String,
    pub bind_addr: SocketAddr,
    pub smtp: Option<SmtpConfig>,
    pub google: GoogleConfig,
    pub cors_origins: Vec<String>,
    /// Grid used when a request names no approved template.
    pub default_periods: Vec<PeriodDefinition>,
}

impl AppConfig {
    /// Builds the configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `APP_ENV` (default: dev)
    /// - `APP_SECRET_KEY` (required unless `APP_ENV=dev`)
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` (default: 60)
    /// - `REFRESH_TOKEN_EXPIRE_DAYS` (default: 7)
    /// - `DATABASE_PATH` (default: campusmeet.db)
    /// - `HOST` / `PORT` (default: 0.0.0.0 / 8000)
    /// - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`,
    ///   `SMTP_USE_TLS` (true)
    /// - `GOOGLE_CLIENT_ID`
    /// - `CORS_ORIGINS` (comma separated)
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
        let secret_key = match env::var("APP_SECRET_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ if app_env == "dev" => DEV_SECRET_KEY.to_string(),
            _ => return Err(ConfigError::Missing("APP_SECRET_KEY")),
        };

        let access_minutes: i64 = parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", 60, "a number of minutes")?;
        let refresh_days: i64 = parse_var("REFRESH_TOKEN_EXPIRE_DAYS", 7, "a number of days")?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_var("PORT", 8000, "a valid port number")?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "HOST",
                expected: "an IP address",
                value: host.clone(),
            })?;

        let smtp = match env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()) {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_var("SMTP_PORT", 587, "a valid port number")?,
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from: env::var("SMTP_FROM").unwrap_or_else(|_| "no-reply@localhost".to_string()),
                use_tls: parse_var("SMTP_USE_TLS", true, "true or false")?,
            }),
            None => None,
        };

        let google = GoogleConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").ok().filter(|s| !s.is_empty()),
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            app_env,
            secret_key,
            access_token_ttl: Duration::minutes(access_minutes),
            refresh_token_ttl: Duration::days(refresh_days),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "campusmeet.db".to_string()),
            bind_addr,
            smtp,
            google,
            cors_origins,
            default_periods: default_periods(),
        })
    }

    /// Configuration for tests and local tooling: dev secret, in-memory friendly paths.
    pub fn for_tests() -> Self {
        Self {
            app_env: "test".to_string(),
            secret_key: "test-secret-key".to_string(),
            access_token_ttl: Duration::minutes(60),
            refresh_token_ttl: Duration::days(7),
            database_path: ":memory:".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            smtp: None,
            google: GoogleConfig::default(),
            cors_origins: Vec::new(),
            default_periods: default_periods(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let v: u16 = parse_var("CAMPUSMEET_SURELY_UNSET_VAR", 42, "a number").unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_test_config_carries_default_grid() {
        let config = AppConfig::for_tests();
        assert_eq!(config.default_periods, default_periods());
        assert!(config.smtp.is_none());
    }
}
