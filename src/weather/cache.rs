//! Cache-aside decorator for any [`WeatherProvider`].

use crate::domain::Weather;
use crate::ports::{WeatherProvider, WeatherResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(20 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    weather: Weather,
    expires_at: Instant,
}

/// Serves repeated lookups for a city from memory until the entry expires.
///
/// Keys are the trimmed, lowercased city name. Errors are never cached.
pub struct CachedWeatherProvider {
    upstream: Arc<dyn WeatherProvider>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CachedWeatherProvider {
    pub fn new(upstream: Arc<dyn WeatherProvider>) -> Self {
        Self::with_ttl(upstream, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(upstream: Arc<dyn WeatherProvider>, ttl: Duration) -> Self {
        Self {
            upstream,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    fn key(city: &str) -> String {
        city.trim().to_lowercase()
    }

    fn cached(&self, key: &str) -> Option<Weather> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        (Instant::now() < entry.expires_at).then(|| entry.weather.clone())
    }
}

#[async_trait]
impl WeatherProvider for CachedWeatherProvider {
    async fn get_weather(&self, city: &str) -> WeatherResult<Weather> {
        let key = Self::key(city);
        if let Some(weather) = self.cached(&key) {
            debug!(city = %key, "Weather cache hit");
            return Ok(weather);
        }

        let weather = self.upstream.get_weather(city).await?;
        self.entries.write().insert(
            key,
            CacheEntry {
                weather: weather.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(weather)
    }
}
