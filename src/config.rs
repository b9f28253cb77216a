use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::auth::RetryPolicy;

const DEFAULT_DATABASE_URL: &str = "sqlite://fitness-hub.db?mode=rwc";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;
const DEFAULT_PROFILE_FETCH_ATTEMPTS: u32 = 3;
const DEFAULT_PROFILE_RETRY_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Runtime settings read from the process environment after the layered
/// env files have been loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub session_ttl_hours: i64,
    pub profile_retry: RetryPolicy,
    /// `None` when any of the email variables is unset; replies are then refused.
    pub email: Option<EmailConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            profile_retry: RetryPolicy {
                max_attempts: DEFAULT_PROFILE_FETCH_ATTEMPTS,
                base_delay: Duration::from_millis(DEFAULT_PROFILE_RETRY_DELAY_MS),
            },
            email: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let session_ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            anyhow::bail!(
                "SESSION_TTL_HOURS must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS,
                session_ttl_hours
            );
        }

        let max_attempts: u32 =
            parse_var("PROFILE_FETCH_ATTEMPTS", DEFAULT_PROFILE_FETCH_ATTEMPTS)?;
        let delay_ms: u64 = parse_var("PROFILE_RETRY_DELAY_MS", DEFAULT_PROFILE_RETRY_DELAY_MS)?;

        let email = match (
            non_empty_var("EMAIL_API_URL"),
            non_empty_var("EMAIL_API_KEY"),
            non_empty_var("EMAIL_FROM"),
        ) {
            (Some(api_url), Some(api_key), Some(from)) => Some(EmailConfig {
                api_url,
                api_key,
                from,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            session_ttl_hours,
            profile_retry: RetryPolicy {
                max_attempts: max_attempts.max(1),
                base_delay: Duration::from_millis(delay_ms),
            },
            email,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    dotenvy::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        None => Ok(default),
    }
}
