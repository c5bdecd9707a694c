//! Settings loaded from environment variables.
//!
//! [`Settings::from_env`] reads an optional `.env` file first, then the
//! process environment. [`Settings::from_lookup`] takes any key lookup, which
//! keeps tests away from the real environment.

use crate::logging::LogFormat;
use crate::weather::{DEFAULT_CACHE_TTL, DEFAULT_WEATHER_API_URL};
use skybell_cron::{CronExpression, CronPresets};
use skybell_events::{DEFAULT_OVERFLOW_BUDGET, DEFAULT_OVERFLOW_TIMEOUT, DEFAULT_QUEUE_CAPACITY};
use skybell_mail::{SmtpConfig, SmtpSecurity};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_EVENT_WORKERS: usize = 10;
pub const DEFAULT_SMTP_PORT: u16 = 587;

const REQUIRED_KEYS: &[&str] = &["WEATHER_API_KEY"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Failed to parse {key}: {message}")]
    Parse { key: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

impl ConfigError {
    fn parse(key: &str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub api_key: String,
    pub api_url: String,
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub security: SmtpSecurity,
}

impl SmtpSettings {
    pub fn to_config(&self) -> SmtpConfig {
        let config = SmtpConfig::new(&self.host, &self.from)
            .port(self.port)
            .security(self.security);
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => config.credentials(username, password),
            _ => config,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub overflow_budget: usize,
    pub overflow_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub hourly: CronExpression,
    pub daily: CronExpression,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub weather: WeatherSettings,
    pub smtp: SmtpSettings,
    pub events: EventSettings,
    pub schedules: ScheduleSettings,
    pub templates_dir: Option<PathBuf>,
    pub log: LogSettings,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| values.get(key).cloned())
    }

    /// Build settings from `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|&&key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let settings = Self {
            base_url: get("BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            weather: WeatherSettings {
                api_key: get("WEATHER_API_KEY").unwrap_or_default(),
                api_url: get("WEATHER_API_URL").unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string()),
                cache_ttl: parse_or(&get, "WEATHER_CACHE_TTL_SECS", DEFAULT_CACHE_TTL.as_secs())
                    .map(Duration::from_secs)?,
            },
            smtp: SmtpSettings {
                host: get("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&get, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from: get("SMTP_FROM").unwrap_or_else(|| "Skybell <noreply@localhost>".to_string()),
                security: parse_or(&get, "SMTP_SECURITY", SmtpSecurity::default())?,
            },
            events: EventSettings {
                workers: parse_or(&get, "EVENT_WORKERS", DEFAULT_EVENT_WORKERS)?,
                queue_capacity: parse_or(&get, "EVENT_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?,
                overflow_budget: parse_or(&get, "EVENT_OVERFLOW_BUDGET", DEFAULT_OVERFLOW_BUDGET)?,
                overflow_timeout: parse_or(
                    &get,
                    "EVENT_OVERFLOW_TIMEOUT_SECS",
                    DEFAULT_OVERFLOW_TIMEOUT.as_secs(),
                )
                .map(Duration::from_secs)?,
            },
            schedules: ScheduleSettings {
                hourly: schedule(&get, "HOURLY_SCHEDULE", CronPresets::HOURLY)?,
                daily: schedule(&get, "DAILY_SCHEDULE", CronPresets::DAILY_NOON)?,
            },
            templates_dir: get("TEMPLATES_DIR").map(PathBuf::from),
            log: LogSettings {
                level: get("SKYBELL_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                format: parse_or(&get, "SKYBELL_LOG_FORMAT", LogFormat::default())?,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "BASE_URL must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if self.smtp.port == 0 {
            return Err(ConfigError::Validation("SMTP_PORT must not be 0".to_string()));
        }
        if self.smtp.username.is_some() != self.smtp.password.is_some() {
            return Err(ConfigError::Validation(
                "SMTP_USERNAME and SMTP_PASSWORD must be set together".to_string(),
            ));
        }
        if self.weather.cache_ttl.is_zero() {
            return Err(ConfigError::Validation(
                "WEATHER_CACHE_TTL_SECS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e| ConfigError::parse(key, e)),
        None => Ok(default),
    }
}

fn schedule<G>(get: &G, key: &str, default: &str) -> Result<CronExpression>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    CronExpression::parse(&raw).map_err(|e| ConfigError::parse(key, e))
}
