//! Event definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Event trait
///
/// Implemented by the closed set of events an application publishes. Each
/// value knows its own kind, so an event can never be routed under a kind
/// that disagrees with its payload.
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// Discriminant used to route the event to handlers.
    type Kind: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Kind of this event.
    fn kind(&self) -> Self::Kind;
}

/// Base event metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event ID
    pub id: Uuid,

    /// Timestamp when the event was created
    pub created_at: DateTime<Utc>,

    /// Optional correlation ID for tracing
    pub correlation_id: Option<Uuid>,

    /// Component that produced the event
    pub source: Option<String>,
}

impl EventMetadata {
    /// Create new event metadata
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            correlation_id: None,
            source: None,
        }
    }

    /// Set correlation ID
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Set the producing component
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// An event in flight: payload, metadata and cancellation context.
///
/// Envelopes are immutable once built. Handlers observe cancellation through
/// [`Envelope::cancellation`].
#[derive(Debug, Clone)]
pub struct Envelope<E: Event> {
    event: E,
    metadata: EventMetadata,
    cancellation: CancellationToken,
}

impl<E: Event> Envelope<E> {
    /// Wrap an event with fresh metadata and an unlinked cancellation token.
    pub fn new(event: E) -> Self {
        Self {
            event,
            metadata: EventMetadata::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the metadata.
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replace the cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    pub fn kind(&self) -> E::Kind {
        self.event.kind()
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the producer or the bus has cancelled this event.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn into_event(self) -> E {
        self.event
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) enum TestKind {
        Ping,
        Pong,
    }

    impl Display for TestKind {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Ping => f.write_str("ping"),
                Self::Pong => f.write_str("pong"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum TestEvent {
        Ping(u32),
        Pong(String),
    }

    impl Event for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                Self::Ping(_) => TestKind::Ping,
                Self::Pong(_) => TestKind::Pong,
            }
        }
    }

    #[test]
    fn test_event_metadata() {
        let correlation = Uuid::new_v4();
        let metadata = EventMetadata::new()
            .with_correlation_id(correlation)
            .with_source("signup");

        assert_eq!(metadata.correlation_id, Some(correlation));
        assert_eq!(metadata.source.as_deref(), Some("signup"));
    }

    #[test]
    fn test_envelope_kind_follows_payload() {
        let envelope = Envelope::new(TestEvent::Pong("hi".to_string()));
        assert_eq!(envelope.kind(), TestKind::Pong);
        assert_eq!(envelope.event(), &TestEvent::Pong("hi".to_string()));
    }

    #[test]
    fn test_envelope_cancellation() {
        let token = CancellationToken::new();
        let envelope = Envelope::new(TestEvent::Ping(1)).with_cancellation(token.child_token());

        assert!(!envelope.is_cancelled());
        token.cancel();
        assert!(envelope.is_cancelled());
    }
}
