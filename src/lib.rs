//! # Skybell
//!
//! Scheduled weather notifications delivered through an in-process event
//! bus.
//!
//! - [`events`]: the application event enum and typed handler registration
//!   on top of [`skybell_events::Publisher`]
//! - [`notify`]: the confirmation and weather update handlers plus the
//!   [`FanOutJob`](notify::FanOutJob) run by the scheduler
//! - [`weather`]: weatherapi.com client with a TTL cache in front
//! - [`subscribe`]: creates subscriptions and announces them on the bus
//! - [`app`]: wires it all together from [`Settings`](config::Settings)
//!
//! ## Example
//!
//! ```rust,ignore
//! use skybell::prelude::*;
//!
//! let settings = Settings::from_env()?;
//! skybell::logging::init(&settings.log).ok();
//!
//! let app = Application::from_settings(settings)?;
//! app.run_until_signal().await?;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod logging;
pub mod notify;
pub mod ports;
pub mod repository;
pub mod subscribe;
pub mod weather;

pub use skybell_cron as cron;
pub use skybell_events as bus;
pub use skybell_mail as mail;

pub mod prelude {
    pub use crate::app::{Application, Collaborators};
    pub use crate::config::{ConfigError, Settings};
    pub use crate::domain::{Frequency, Subscriber, Subscription, Weather, WeatherUpdate};
    pub use crate::error::AppError;
    pub use crate::events::{AppEvent, AppPublisher, EventType, PayloadHandler, register_handler};
    pub use crate::notify::{FanOutJob, FanOutReport};
    pub use crate::ports::{SubscriptionRepository, WeatherError, WeatherProvider};
    pub use crate::subscribe::{SubscribeError, SubscribeWeather};
}
