use super::{unsubscribe_link, weather_context};
use crate::domain::{Frequency, Subscriber};
use crate::ports::{RepositoryError, SubscriptionRepository, WeatherProvider};
use skybell_mail::{EmailSender, TemplateRenderer, WEATHER_UPDATE_TEMPLATE};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// The run could not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FanOutError {
    #[error("Failed to list {frequency} subscriptions: {source}")]
    ListSubscribers {
        frequency: Frequency,
        #[source]
        source: RepositoryError,
    },
}

/// Outcome counts of one fan-out run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub listed: usize,
    pub sent: usize,
    pub weather_failures: usize,
    pub render_failures: usize,
    pub send_failures: usize,
}

impl FanOutReport {
    pub fn failures(&self) -> usize {
        self.weather_failures + self.render_failures + self.send_failures
    }
}

enum Outcome {
    Sent,
    WeatherFailed,
    RenderFailed,
    SendFailed,
}

/// Sends the scheduled weather email to every confirmed subscriber of a
/// cadence.
///
/// Subscribers are processed one after another. A failure for one
/// subscriber is logged and counted and never affects the others.
#[derive(Clone)]
pub struct FanOutJob {
    repository: Arc<dyn SubscriptionRepository>,
    weather: Arc<dyn WeatherProvider>,
    sender: Arc<dyn EmailSender>,
    renderer: Arc<dyn TemplateRenderer>,
    base_url: String,
}

impl FanOutJob {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        weather: Arc<dyn WeatherProvider>,
        sender: Arc<dyn EmailSender>,
        renderer: Arc<dyn TemplateRenderer>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            weather,
            sender,
            renderer,
            base_url: base_url.into(),
        }
    }

    /// Subject line for a scheduled update.
    pub fn subject(frequency: Frequency, city: &str) -> String {
        format!("{} Weather Update for {}", frequency.label(), city)
    }

    pub async fn run(&self, frequency: Frequency) -> Result<FanOutReport, FanOutError> {
        let subscribers = self
            .repository
            .get_confirmed_subscriptions(frequency)
            .await
            .map_err(|source| FanOutError::ListSubscribers { frequency, source })?;

        let mut report = FanOutReport {
            listed: subscribers.len(),
            ..FanOutReport::default()
        };

        for subscriber in &subscribers {
            match self.notify(frequency, subscriber).await {
                Outcome::Sent => report.sent += 1,
                Outcome::WeatherFailed => report.weather_failures += 1,
                Outcome::RenderFailed => report.render_failures += 1,
                Outcome::SendFailed => report.send_failures += 1,
            }
        }

        info!(
            frequency = %frequency,
            listed = report.listed,
            sent = report.sent,
            failed = report.failures(),
            "Weather fan-out finished"
        );
        Ok(report)
    }

    async fn notify(&self, frequency: Frequency, subscriber: &Subscriber) -> Outcome {
        let weather = match self.weather.get_weather(&subscriber.city).await {
            Ok(weather) => weather,
            Err(e) => {
                warn!(city = %subscriber.city, email = %subscriber.email, error = %e, "Failed to get weather");
                return Outcome::WeatherFailed;
            }
        };

        let context = weather_context(
            &subscriber.city,
            &weather,
            unsubscribe_link(&self.base_url, &subscriber.unsubscribe_token),
        );
        let body = match self.renderer.render(WEATHER_UPDATE_TEMPLATE, &context) {
            Ok(body) => body,
            Err(e) => {
                warn!(city = %subscriber.city, error = %e, "Failed to render weather update");
                return Outcome::RenderFailed;
            }
        };

        let subject = Self::subject(frequency, &subscriber.city);
        match self.sender.send_message(&subscriber.email, &subject, &body).await {
            Ok(()) => Outcome::Sent,
            Err(e) => {
                warn!(email = %subscriber.email, error = %e, "Failed to send weather update");
                Outcome::SendFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_names_cadence() {
        assert_eq!(
            FanOutJob::subject(Frequency::Hourly, "Kyiv"),
            "Hourly Weather Update for Kyiv"
        );
        assert_eq!(
            FanOutJob::subject(Frequency::Daily, "Kyiv"),
            "Daily Weather Update for Kyiv"
        );
    }

    #[test]
    fn test_report_failures() {
        let report = FanOutReport {
            listed: 5,
            sent: 2,
            weather_failures: 1,
            render_failures: 1,
            send_failures: 1,
        };
        assert_eq!(report.failures(), 3);
    }
}
