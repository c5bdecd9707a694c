//! weatherapi.com `current.json` client.

use crate::domain::Weather;
use crate::ports::{WeatherError, WeatherProvider, WeatherResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.weatherapi.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CITY_NOT_FOUND_CODE: u32 = 1006;

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    humidity: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u32,
    message: String,
}

/// HTTP client for the weatherapi.com current conditions endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    inner: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> WeatherResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("skybell/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn get_weather(&self, city: &str) -> WeatherResult<Weather> {
        let url = format!("{}/current.json", self.base_url);
        debug!(city = %city, "Requesting current weather");

        let response = self
            .inner
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: CurrentResponse = response.json().await?;
                Ok(Weather {
                    temperature: body.current.temp_c,
                    humidity: body.current.humidity,
                    description: body.current.condition.text,
                })
            }
            StatusCode::BAD_REQUEST => {
                let body: ErrorResponse = response.json().await?;
                if body.error.code == CITY_NOT_FOUND_CODE {
                    return Err(WeatherError::CityNotFound(city.to_string()));
                }
                warn!(city = %city, code = body.error.code, message = %body.error.message, "Weather API rejected request");
                Err(WeatherError::Upstream {
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    message: body.error.message,
                })
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                warn!(city = %city, status = status.as_u16(), "Weather API returned an error status");
                Err(WeatherError::Upstream {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
