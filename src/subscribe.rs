//! Subscribe use case.

use crate::domain::{Frequency, Subscription};
use crate::events::{AppEvent, AppPublisher};
use crate::ports::{RepositoryError, SubscriptionRepository, WeatherError, WeatherProvider};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Subscription already exists")]
    AlreadySubscribed,

    #[error("Weather lookup failed: {0}")]
    Weather(WeatherError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<WeatherError> for SubscribeError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::CityNotFound(city) => Self::CityNotFound(city),
            other => Self::Weather(other),
        }
    }
}

/// Creates a pending subscription and announces it on the bus.
///
/// The confirmation email is sent by whichever handler listens for
/// [`AppEvent::UserSubscribed`]; this call returns once the subscription
/// is stored.
#[derive(Clone)]
pub struct SubscribeWeather {
    repository: Arc<dyn SubscriptionRepository>,
    weather: Arc<dyn WeatherProvider>,
    publisher: AppPublisher,
}

impl SubscribeWeather {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        weather: Arc<dyn WeatherProvider>,
        publisher: AppPublisher,
    ) -> Self {
        Self {
            repository,
            weather,
            publisher,
        }
    }

    pub async fn subscribe(
        &self,
        email: &str,
        city: &str,
        frequency: Frequency,
    ) -> Result<Subscription, SubscribeError> {
        let email = email.trim();
        let city = city.trim();
        if !is_plausible_email(email) {
            return Err(SubscribeError::InvalidEmail(email.to_string()));
        }

        self.weather.get_weather(city).await?;

        if self.repository.is_subscribed(email, city).await? {
            return Err(SubscribeError::AlreadySubscribed);
        }

        let subscription = Subscription::new(email, city, frequency);
        match self.repository.save(&subscription).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate { .. }) => return Err(SubscribeError::AlreadySubscribed),
            Err(e) => return Err(e.into()),
        }

        info!(email = %email, city = %city, frequency = %frequency, "New subscription");
        self.publisher
            .trigger_async(AppEvent::UserSubscribed(subscription.clone()));
        Ok(subscription)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
