//! Application events and typed handler registration.

use crate::domain::{Subscription, WeatherUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skybell_events::{Envelope, Event, EventHandler, HandlerError, Publisher};
use std::fmt;
use std::marker::PhantomData;

/// Routing tag for [`AppEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    UserSubscribed,
    WeatherEvent,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserSubscribed => f.write_str("user_subscribed"),
            Self::WeatherEvent => f.write_str("weather_event"),
        }
    }
}

/// Every event the application publishes.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A subscription was stored and awaits confirmation.
    UserSubscribed(Subscription),
    /// Current weather for one subscriber.
    WeatherEvent(WeatherUpdate),
}

impl Event for AppEvent {
    type Kind = EventType;

    fn kind(&self) -> EventType {
        match self {
            Self::UserSubscribed(_) => EventType::UserSubscribed,
            Self::WeatherEvent(_) => EventType::WeatherEvent,
        }
    }
}

pub type AppPublisher = Publisher<AppEvent>;

/// A payload carried by exactly one [`AppEvent`] variant.
pub trait Payload: Send + Sync + 'static {
    const KIND: EventType;

    fn from_event(event: &AppEvent) -> Option<&Self>;
}

impl Payload for Subscription {
    const KIND: EventType = EventType::UserSubscribed;

    fn from_event(event: &AppEvent) -> Option<&Self> {
        match event {
            AppEvent::UserSubscribed(subscription) => Some(subscription),
            _ => None,
        }
    }
}

impl Payload for WeatherUpdate {
    const KIND: EventType = EventType::WeatherEvent;

    fn from_event(event: &AppEvent) -> Option<&Self> {
        match event {
            AppEvent::WeatherEvent(update) => Some(update),
            _ => None,
        }
    }
}

/// Handler for a single payload type.
#[async_trait]
pub trait PayloadHandler<P: Payload>: Send + Sync {
    async fn handle(&self, payload: &P, envelope: &Envelope<AppEvent>) -> Result<(), HandlerError>;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

struct Typed<P, H> {
    handler: H,
    _payload: PhantomData<fn(&P)>,
}

#[async_trait]
impl<P, H> EventHandler<AppEvent> for Typed<P, H>
where
    P: Payload,
    H: PayloadHandler<P>,
{
    async fn handle(&self, envelope: &Envelope<AppEvent>) -> Result<(), HandlerError> {
        match P::from_event(envelope.event()) {
            Some(payload) => self.handler.handle(payload, envelope).await,
            None => Err(HandlerError::UnexpectedEvent(envelope.kind().to_string())),
        }
    }

    fn name(&self) -> &str {
        self.handler.name()
    }
}

/// Register `handler` under the event type that carries its payload.
pub fn register_handler<P, H>(publisher: &AppPublisher, handler: H)
where
    P: Payload,
    H: PayloadHandler<P> + 'static,
{
    publisher.register(
        P::KIND,
        Typed {
            handler,
            _payload: PhantomData,
        },
    );
}
