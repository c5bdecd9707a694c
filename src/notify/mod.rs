//! Outbound notifications: event handlers and the scheduled fan-out job.

mod fanout;
mod handlers;

pub use fanout::{FanOutError, FanOutJob, FanOutReport};
pub use handlers::{ConfirmationEmailHandler, WeatherUpdateHandler, register_notification_handlers};

use crate::domain::{Weather, WeatherUpdate};
use serde_json::{Value, json};

/// Subject of the subscription confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "Confirm your email";

/// Subject of an event-driven weather update email.
pub const WEATHER_UPDATE_SUBJECT: &str = "Weather update";

/// Link that confirms a pending subscription.
pub fn confirm_link(base_url: &str, token: &str) -> String {
    format!("{}/confirm/{}", base_url.trim_end_matches('/'), token)
}

/// Link that cancels a subscription.
pub fn unsubscribe_link(base_url: &str, token: &str) -> String {
    format!("{}/unsubscribe/{}", base_url.trim_end_matches('/'), token)
}

pub(crate) fn weather_context(city: &str, weather: &Weather, unsubscribe_url: String) -> Value {
    json!({
        "city": city,
        "temperature": weather.temperature,
        "humidity": weather.humidity,
        "description": weather.description,
        "unsubscribe_url": unsubscribe_url,
    })
}

pub(crate) fn update_context(update: &WeatherUpdate, base_url: &str) -> Value {
    json!({
        "city": update.city,
        "temperature": update.temperature,
        "humidity": update.humidity,
        "description": update.description,
        "unsubscribe_url": unsubscribe_link(base_url, &update.unsubscribe_token),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_trim_trailing_slash() {
        assert_eq!(
            confirm_link("http://localhost:8080/", "abc"),
            "http://localhost:8080/confirm/abc"
        );
        assert_eq!(
            unsubscribe_link("https://skybell.example", "t1"),
            "https://skybell.example/unsubscribe/t1"
        );
    }
}
