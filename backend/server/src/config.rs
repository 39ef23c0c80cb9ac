use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::{
    error::AppError,
    fallback::{DEFAULT_DELAY_MS, DEFAULT_MESSAGE, FallbackConfig},
};

pub const ANY_ORIGIN: &str = "*";
pub const MAX_RETENTION_DAYS: i64 = 36_500;

pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub fallback: FallbackConfig,
    pub log_retention_days: i64,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let cors_origin: String = try_load("CORS_ORIGIN", ANY_ORIGIN)?;
        let delay_ms: u64 = try_load("FALLBACK_DELAY_MS", &DEFAULT_DELAY_MS.to_string())?;

        Ok(Self {
            port: try_load("PORT", "10000")?,
            cors_origins: split_origins(&cors_origin),
            fallback: FallbackConfig {
                delay: Duration::from_millis(delay_ms),
                message: try_load("FALLBACK_MESSAGE", DEFAULT_MESSAGE)?,
            },
            log_retention_days: check_retention(try_load("LOG_RETENTION_DAYS", "30")?)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 10000,
            cors_origins: vec![ANY_ORIGIN.to_string()],
            fallback: FallbackConfig::default(),
            log_retention_days: 30,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("{key} not set");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            AppError::Config {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

fn check_retention(days: i64) -> Result<i64, AppError> {
    if (1..=MAX_RETENTION_DAYS).contains(&days) {
        return Ok(days);
    }

    warn!("Invalid LOG_RETENTION_DAYS value: {days}");
    Err(AppError::Config {
        key: "LOG_RETENTION_DAYS".to_string(),
        reason: format!("must be between 1 and {MAX_RETENTION_DAYS}"),
    })
}

pub fn split_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec![ANY_ORIGIN.to_string()]
    } else {
        origins
    }
}
