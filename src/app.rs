//! Wiring of the bus, scheduler, collaborators and use cases.

use crate::config::Settings;
use crate::domain::Frequency;
use crate::error::Result;
use crate::events::AppPublisher;
use crate::notify::{FanOutJob, register_notification_handlers};
use crate::ports::{SubscriptionRepository, WeatherProvider};
use crate::repository::InMemorySubscriptionRepository;
use crate::subscribe::SubscribeWeather;
use crate::weather::{CachedWeatherProvider, WeatherApiClient};
use skybell_cron::{CronError, CronExpression, CronScheduler, Job};
use skybell_events::PublisherConfig;
use skybell_mail::{EmailSender, HandlebarsRenderer, SmtpSender, TemplateRenderer};
use std::sync::Arc;
use tracing::{error, info};

pub const HOURLY_JOB: &str = "weather-hourly";
pub const DAILY_JOB: &str = "weather-daily";

/// External services the application talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn SubscriptionRepository>,
    pub weather: Arc<dyn WeatherProvider>,
    pub sender: Arc<dyn EmailSender>,
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl Collaborators {
    /// Production collaborators: weatherapi.com behind a cache, SMTP and
    /// Handlebars templates.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = WeatherApiClient::new(&settings.weather.api_url, &settings.weather.api_key)?;
        let weather = CachedWeatherProvider::with_ttl(Arc::new(client), settings.weather.cache_ttl);

        let renderer = match &settings.templates_dir {
            Some(dir) => HandlebarsRenderer::from_directory(dir)?,
            None => HandlebarsRenderer::with_builtin_templates()?,
        };

        Ok(Self {
            repository: Arc::new(InMemorySubscriptionRepository::new()),
            weather: Arc::new(weather),
            sender: Arc::new(SmtpSender::new(settings.smtp.to_config())?),
            renderer: Arc::new(renderer),
        })
    }
}

/// The assembled service.
pub struct Application {
    settings: Settings,
    publisher: AppPublisher,
    scheduler: CronScheduler,
    subscribe: SubscribeWeather,
    fanout: FanOutJob,
    repository: Arc<dyn SubscriptionRepository>,
}

impl Application {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Result<Self> {
        let events = &settings.events;
        let publisher = AppPublisher::new(
            PublisherConfig::new(events.workers, events.queue_capacity)
                .overflow_budget(events.overflow_budget)
                .overflow_timeout(events.overflow_timeout),
        );
        register_notification_handlers(
            &publisher,
            collaborators.sender.clone(),
            collaborators.renderer.clone(),
            &settings.base_url,
        );

        let fanout = FanOutJob::new(
            collaborators.repository.clone(),
            collaborators.weather.clone(),
            collaborators.sender,
            collaborators.renderer,
            settings.base_url.clone(),
        );

        let scheduler = CronScheduler::new();
        scheduler.add(fanout_job(HOURLY_JOB, settings.schedules.hourly.clone(), &fanout, Frequency::Hourly))?;
        scheduler.add(fanout_job(DAILY_JOB, settings.schedules.daily.clone(), &fanout, Frequency::Daily))?;

        let subscribe = SubscribeWeather::new(
            collaborators.repository.clone(),
            collaborators.weather,
            publisher.clone(),
        );

        Ok(Self {
            settings,
            publisher,
            scheduler,
            subscribe,
            fanout,
            repository: collaborators.repository,
        })
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        let collaborators = Collaborators::from_settings(&settings)?;
        Self::new(settings, collaborators)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn publisher(&self) -> &AppPublisher {
        &self.publisher
    }

    pub fn scheduler(&self) -> &CronScheduler {
        &self.scheduler
    }

    pub fn subscriptions(&self) -> &SubscribeWeather {
        &self.subscribe
    }

    pub fn repository(&self) -> &Arc<dyn SubscriptionRepository> {
        &self.repository
    }

    pub fn fanout(&self) -> &FanOutJob {
        &self.fanout
    }

    /// Start the bus workers, then the scheduler.
    pub fn start(&self) -> Result<()> {
        self.publisher.start()?;
        self.scheduler.start()?;
        info!(
            workers = self.publisher.config().workers,
            hourly = %self.settings.schedules.hourly,
            daily = %self.settings.schedules.daily,
            "Skybell started"
        );
        Ok(())
    }

    /// Stop producing first, then drain the bus.
    pub async fn shutdown(&self) -> Result<()> {
        let scheduler = self.scheduler.stop().await;
        let publisher = self.publisher.stop().await;

        let stats = self.publisher.stats();
        info!(
            processed = stats.processed,
            dropped = stats.dropped,
            handler_failures = stats.handler_failures,
            "Skybell stopped"
        );

        scheduler?;
        publisher?;
        Ok(())
    }

    /// Run until Ctrl-C, then shut down.
    pub async fn run_until_signal(&self) -> Result<()> {
        self.start()?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");

        self.shutdown().await
    }
}

fn fanout_job(name: &str, expression: CronExpression, fanout: &FanOutJob, frequency: Frequency) -> Job {
    let fanout = fanout.clone();
    Job::new(name, expression, move |_ctx| {
        let fanout = fanout.clone();
        async move {
            fanout
                .run(frequency)
                .await
                .map(|_| ())
                .map_err(CronError::execution)
        }
    })
}
