//! Top-level application error.

use crate::config::ConfigError;
use crate::ports::WeatherError;
use skybell_cron::CronError;
use skybell_events::PublisherError;
use skybell_mail::MailError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("Mail setup failed: {0}")]
    Mail(#[from] MailError),

    #[error("Weather client setup failed: {0}")]
    Weather(#[from] WeatherError),

    #[error("Event bus error: {0}")]
    Publisher(#[from] PublisherError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] CronError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
