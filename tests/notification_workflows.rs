//! Integration tests for the notification workflows.

mod common;

use async_trait::async_trait;
use common::{BrokenRepository, Recorder, StubWeather, confirmed, eventually};
use skybell::app::{Application, Collaborators, DAILY_JOB, HOURLY_JOB};
use skybell::bus::{Envelope, HandlerError, PublisherConfig, PublisherState};
use skybell::config::Settings;
use skybell::domain::{Frequency, WeatherUpdate};
use skybell::events::{AppEvent, AppPublisher, PayloadHandler, register_handler};
use skybell::mail::{HandlebarsRenderer, MemorySender};
use skybell::notify::{CONFIRMATION_SUBJECT, FanOutError, FanOutJob, FanOutReport};
use skybell::ports::SubscriptionRepository;
use skybell::repository::InMemorySubscriptionRepository;
use skybell::subscribe::SubscribeError;
use std::collections::HashMap;
use std::sync::Arc;

const BASE_URL: &str = "http://localhost:8080";

fn renderer() -> Arc<HandlebarsRenderer> {
    Arc::new(HandlebarsRenderer::with_builtin_templates().unwrap())
}

fn weather() -> StubWeather {
    StubWeather::new()
        .with_city("Kyiv", 21.0, "Sunny")
        .with_city("Lviv", 14.0, "Drizzle")
        .with_city("Odesa", 25.0, "Clear")
}

fn settings() -> Settings {
    let values = HashMap::from([
        ("WEATHER_API_KEY".to_string(), "test".to_string()),
        ("EVENT_WORKERS".to_string(), "2".to_string()),
        ("EVENT_QUEUE_CAPACITY".to_string(), "8".to_string()),
    ]);
    Settings::from_map(&values).unwrap()
}

// =============================================================================
// Event Bus
// =============================================================================

struct RecordUpdates(Arc<Recorder>);

#[async_trait]
impl PayloadHandler<WeatherUpdate> for RecordUpdates {
    async fn handle(
        &self,
        update: &WeatherUpdate,
        _envelope: &Envelope<AppEvent>,
    ) -> Result<(), HandlerError> {
        self.0.push(&update.email, &update.city);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_weather_event_reaches_handler_once() {
    let publisher = AppPublisher::new(PublisherConfig::new(2, 4));
    let recorder = Arc::new(Recorder::default());
    register_handler::<WeatherUpdate, _>(&publisher, RecordUpdates(recorder.clone()));
    publisher.start().unwrap();

    publisher.trigger_async(AppEvent::WeatherEvent(WeatherUpdate {
        city: "Kyiv".to_string(),
        temperature: 20.0,
        humidity: 40.0,
        description: "Sunny".to_string(),
        email: "a@x.com".to_string(),
        unsubscribe_token: "u".to_string(),
    }));

    assert!(eventually(|| !recorder.seen().is_empty()).await);
    publisher.stop().await.unwrap();

    assert_eq!(
        recorder.seen(),
        [("a@x.com".to_string(), "Kyiv".to_string())]
    );
    assert_eq!(publisher.state(), PublisherState::Stopped);
}

// =============================================================================
// Fan-out Job
// =============================================================================

#[tokio::test]
async fn test_fanout_isolates_weather_failure() {
    let repository = Arc::new(InMemorySubscriptionRepository::new());
    confirmed(
        &repository,
        &[
            ("one@x.com", "Kyiv", Frequency::Daily),
            ("two@x.com", "Odesa", Frequency::Daily),
            ("three@x.com", "Lviv", Frequency::Daily),
        ],
    )
    .await;
    let sender = Arc::new(MemorySender::new());
    let job = FanOutJob::new(
        repository,
        Arc::new(weather().failing("Odesa")),
        sender.clone(),
        renderer(),
        BASE_URL,
    );

    let report = job.run(Frequency::Daily).await.unwrap();

    assert_eq!(
        report,
        FanOutReport {
            listed: 3,
            sent: 2,
            weather_failures: 1,
            ..FanOutReport::default()
        }
    );
    assert_eq!(sender.recipients(), ["one@x.com", "three@x.com"]);
    let sent = sender.sent();
    assert_eq!(sent[0].subject, "Daily Weather Update for Kyiv");
    assert!(sent[1].body.contains("Drizzle"));
}

#[tokio::test]
async fn test_fanout_send_failure_continues() {
    let repository = Arc::new(InMemorySubscriptionRepository::new());
    let stored = confirmed(
        &repository,
        &[
            ("one@x.com", "Kyiv", Frequency::Hourly),
            ("two@x.com", "Lviv", Frequency::Hourly),
            ("daily@x.com", "Odesa", Frequency::Daily),
        ],
    )
    .await;
    let sender = Arc::new(MemorySender::new());
    sender.reject("one@x.com");
    let job = FanOutJob::new(repository, Arc::new(weather()), sender.clone(), renderer(), BASE_URL);

    let report = job.run(Frequency::Hourly).await.unwrap();

    assert_eq!(report.listed, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.send_failures, 1);
    let sent = sender.sent();
    assert_eq!(sent[0].subject, "Hourly Weather Update for Lviv");
    assert!(sent[0].body.contains(&format!(
        "{BASE_URL}/unsubscribe/{}",
        stored[1].unsubscribe_token
    )));
}

#[tokio::test]
async fn test_fanout_render_failure_continues() {
    let repository = Arc::new(InMemorySubscriptionRepository::new());
    confirmed(
        &repository,
        &[
            ("one@x.com", "Kyiv", Frequency::Daily),
            ("two@x.com", "Lviv", Frequency::Daily),
        ],
    )
    .await;
    let sender = Arc::new(MemorySender::new());
    let job = FanOutJob::new(
        repository,
        Arc::new(weather()),
        sender.clone(),
        Arc::new(HandlebarsRenderer::new()),
        BASE_URL,
    );

    let report = job.run(Frequency::Daily).await.unwrap();

    assert_eq!(report.render_failures, 2);
    assert_eq!(report.sent, 0);
    assert!(sender.sent().is_empty());
}

#[tokio::test]
async fn test_fanout_listing_failure_fails_run() {
    let job = FanOutJob::new(
        Arc::new(BrokenRepository),
        Arc::new(weather()),
        Arc::new(MemorySender::new()),
        renderer(),
        BASE_URL,
    );

    let err = job.run(Frequency::Hourly).await.unwrap_err();
    assert!(matches!(
        err,
        FanOutError::ListSubscribers {
            frequency: Frequency::Hourly,
            ..
        }
    ));
}

// =============================================================================
// Subscribe and Application
// =============================================================================

fn application(sender: Arc<MemorySender>, weather: StubWeather) -> Application {
    let collaborators = Collaborators {
        repository: Arc::new(InMemorySubscriptionRepository::new()),
        weather: Arc::new(weather),
        sender,
        renderer: renderer(),
    };
    Application::new(settings(), collaborators).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscribe_sends_confirmation_through_bus() {
    let sender = Arc::new(MemorySender::new());
    let app = application(sender.clone(), weather());
    app.start().unwrap();

    let subscription = app
        .subscriptions()
        .subscribe(" a@x.com ", "Kyiv", Frequency::Daily)
        .await
        .unwrap();

    assert!(eventually(|| sender.sent().len() == 1).await);
    app.shutdown().await.unwrap();

    let sent = sender.sent();
    assert_eq!(sent[0].recipient, "a@x.com");
    assert_eq!(sent[0].subject, CONFIRMATION_SUBJECT);
    assert!(sent[0].body.contains(&format!(
        "{BASE_URL}/confirm/{}",
        subscription.confirmation_token
    )));
    assert!(app.repository().is_subscribed("a@x.com", "Kyiv").await.unwrap());
}

#[tokio::test]
async fn test_subscribe_rejections() {
    let sender = Arc::new(MemorySender::new());
    let app = application(sender.clone(), StubWeather::new().with_city("Kyiv", 1.0, "Snow"));

    app.subscriptions()
        .subscribe("a@x.com", "Kyiv", Frequency::Daily)
        .await
        .unwrap();

    assert_eq!(
        app.subscriptions()
            .subscribe("a@x.com", "Kyiv", Frequency::Hourly)
            .await
            .unwrap_err(),
        SubscribeError::AlreadySubscribed
    );
    assert_eq!(
        app.subscriptions()
            .subscribe("a@x.com", "Atlantis", Frequency::Daily)
            .await
            .unwrap_err(),
        SubscribeError::CityNotFound("Atlantis".to_string())
    );
    assert!(matches!(
        app.subscriptions()
            .subscribe("not-an-email", "Kyiv", Frequency::Daily)
            .await,
        Err(SubscribeError::InvalidEmail(_))
    ));
    assert_eq!(app.publisher().stats().enqueued, 1);
}

#[tokio::test]
async fn test_application_schedules_fanout_jobs() {
    let sender = Arc::new(MemorySender::new());
    let app = application(sender.clone(), weather());

    assert_eq!(app.scheduler().list_jobs(), [DAILY_JOB, HOURLY_JOB]);

    let subscription = app
        .subscriptions()
        .subscribe("a@x.com", "Lviv", Frequency::Hourly)
        .await
        .unwrap();
    app.repository()
        .confirm(&subscription.confirmation_token)
        .await
        .unwrap();

    app.scheduler().run_now(HOURLY_JOB).await.unwrap();
    app.scheduler().run_now(DAILY_JOB).await.unwrap();

    assert_eq!(sender.recipients(), ["a@x.com"]);
    assert_eq!(sender.sent()[0].subject, "Hourly Weather Update for Lviv");
    assert_eq!(app.scheduler().get_stats(HOURLY_JOB).unwrap().execution_count, 1);
}

#[tokio::test]
async fn test_second_shutdown_fails() {
    let app = application(Arc::new(MemorySender::new()), weather());
    app.start().unwrap();
    assert!(app.start().is_err());

    app.shutdown().await.unwrap();
    assert!(app.shutdown().await.is_err());
    assert_eq!(app.publisher().state(), PublisherState::Stopped);
}
