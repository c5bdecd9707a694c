//! Collaborator interfaces consumed by the notification core.

use crate::domain::{Frequency, Subscriber, Subscription, Weather};
use async_trait::async_trait;
use thiserror::Error;

/// Subscription storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Subscription not found")]
    NotFound,

    #[error("Subscription for {email} in {city} already exists")]
    Duplicate { email: String, city: String },

    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Persistent subscription storage.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn save(&self, subscription: &Subscription) -> RepositoryResult<()>;

    async fn is_subscribed(&self, email: &str, city: &str) -> RepositoryResult<bool>;

    /// Mark the subscription holding `token` as confirmed.
    async fn confirm(&self, token: &str) -> RepositoryResult<Subscription>;

    async fn find_by_unsubscribe_token(&self, token: &str) -> RepositoryResult<Subscription>;

    async fn delete(&self, token: &str) -> RepositoryResult<()>;

    /// Confirmed subscribers for one cadence, in insertion order.
    async fn get_confirmed_subscriptions(
        &self,
        frequency: Frequency,
    ) -> RepositoryResult<Vec<Subscriber>>;
}

/// Weather lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Weather API error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("Weather API request failed: {0}")]
    Request(String),

    #[error("Invalid weather response: {0}")]
    InvalidResponse(String),
}

impl WeatherError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CityNotFound(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

pub type WeatherResult<T> = std::result::Result<T, WeatherError>;

/// Current weather lookup by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn get_weather(&self, city: &str) -> WeatherResult<Weather>;
}
