//! Weather lookup: the weatherapi.com client and a caching decorator.

mod cache;
mod client;

pub use cache::{CachedWeatherProvider, DEFAULT_CACHE_TTL};
pub use client::{DEFAULT_WEATHER_API_URL, WeatherApiClient};
