//! Shared test doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use skybell::domain::{Frequency, Subscriber, Subscription, Weather};
use skybell::ports::{
    RepositoryError, RepositoryResult, SubscriptionRepository, WeatherError, WeatherProvider,
    WeatherResult,
};
use skybell::repository::InMemorySubscriptionRepository;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Weather provider answering from a fixed table.
///
/// Cities listed in `failing` return an upstream error; cities missing from
/// the table are not found.
#[derive(Default)]
pub struct StubWeather {
    known: HashMap<String, Weather>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl StubWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city: &str, temperature: f64, description: &str) -> Self {
        self.known.insert(
            city.to_string(),
            Weather {
                temperature,
                humidity: 50.0,
                description: description.to_string(),
            },
        );
        self
    }

    pub fn failing(mut self, city: &str) -> Self {
        self.failing.insert(city.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for StubWeather {
    async fn get_weather(&self, city: &str) -> WeatherResult<Weather> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(city) {
            return Err(WeatherError::Upstream {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.known
            .get(city)
            .cloned()
            .ok_or_else(|| WeatherError::CityNotFound(city.to_string()))
    }
}

/// Repository whose listing always fails.
pub struct BrokenRepository;

#[async_trait]
impl SubscriptionRepository for BrokenRepository {
    async fn save(&self, _subscription: &Subscription) -> RepositoryResult<()> {
        Err(unavailable())
    }

    async fn is_subscribed(&self, _email: &str, _city: &str) -> RepositoryResult<bool> {
        Err(unavailable())
    }

    async fn confirm(&self, _token: &str) -> RepositoryResult<Subscription> {
        Err(unavailable())
    }

    async fn find_by_unsubscribe_token(&self, _token: &str) -> RepositoryResult<Subscription> {
        Err(unavailable())
    }

    async fn delete(&self, _token: &str) -> RepositoryResult<()> {
        Err(unavailable())
    }

    async fn get_confirmed_subscriptions(
        &self,
        _frequency: Frequency,
    ) -> RepositoryResult<Vec<Subscriber>> {
        Err(unavailable())
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("connection refused".to_string())
}

/// Records `(email, city)` pairs seen by a handler.
#[derive(Default)]
pub struct Recorder(Mutex<Vec<(String, String)>>);

impl Recorder {
    pub fn push(&self, email: &str, city: &str) {
        self.0.lock().unwrap().push((email.to_string(), city.to_string()));
    }

    pub fn seen(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }
}

/// Store confirmed subscriptions, in order.
pub async fn confirmed(
    repository: &InMemorySubscriptionRepository,
    entries: &[(&str, &str, Frequency)],
) -> Vec<Subscription> {
    let mut stored = Vec::new();
    for (email, city, frequency) in entries {
        let subscription = Subscription::new(*email, *city, *frequency);
        repository.save(&subscription).await.unwrap();
        stored.push(repository.confirm(&subscription.confirmation_token).await.unwrap());
    }
    stored
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
