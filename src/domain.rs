//! Subscription and weather domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// How often a subscriber receives updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Hourly,
    Daily,
}

impl Frequency {
    pub const ALL: [Frequency; 2] = [Frequency::Hourly, Frequency::Daily];

    /// Wire name, as stored and accepted from clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
        }
    }

    /// Human-readable cadence, e.g. for subject lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hourly => "Hourly",
            Self::Daily => "Daily",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown frequency name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frequency: {0}")]
pub struct ParseFrequencyError(pub String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOURLY" => Ok(Self::Hourly),
            "DAILY" => Ok(Self::Daily),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

/// A stored subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub email: String,
    pub city: String,
    pub frequency: Frequency,
    pub confirmation_token: String,
    pub unsubscribe_token: String,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// New unconfirmed subscription with fresh time-ordered tokens.
    pub fn new(email: impl Into<String>, city: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            city: city.into(),
            frequency,
            confirmation_token: Uuid::now_v7().to_string(),
            unsubscribe_token: Uuid::now_v7().to_string(),
            confirmed: false,
            created_at: Utc::now(),
            confirmed_at: None,
        }
    }

    pub fn confirm(&mut self) {
        if !self.confirmed {
            self.confirmed = true;
            self.confirmed_at = Some(Utc::now());
        }
    }

    /// Read-only view handed to the fan-out job.
    pub fn subscriber(&self) -> Subscriber {
        Subscriber {
            email: self.email.clone(),
            city: self.city.clone(),
            frequency: self.frequency,
            unsubscribe_token: self.unsubscribe_token.clone(),
        }
    }
}

/// A confirmed recipient of scheduled updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub city: String,
    pub frequency: Frequency,
    pub unsubscribe_token: String,
}

/// Current conditions for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    pub description: String,
}

/// Payload of a weather notification for one subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherUpdate {
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub description: String,
    pub email: String,
    pub unsubscribe_token: String,
}

impl WeatherUpdate {
    pub fn new(subscriber: &Subscriber, weather: &Weather) -> Self {
        Self {
            city: subscriber.city.clone(),
            temperature: weather.temperature,
            humidity: weather.humidity,
            description: weather.description.clone(),
            email: subscriber.email.clone(),
            unsubscribe_token: subscriber.unsubscribe_token.clone(),
        }
    }
}
