//! Event handler traits

use crate::error::HandlerError;
use crate::event::{Envelope, Event};
use async_trait::async_trait;
use std::future::Future;

/// Event handler trait
///
/// Handlers are stateless with respect to the bus; anything they need is
/// injected when they are constructed.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// Handle the event
    async fn handle(&self, envelope: &Envelope<E>) -> Result<(), HandlerError>;

    /// Name used in diagnostics
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler backed by an async closure.
pub struct FnHandler<F> {
    name: String,
    function: F,
}

/// Build a handler from an async closure.
///
/// ```
/// use skybell_events::{Envelope, Event, Publisher, PublisherConfig, handler_fn};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Debug, Clone)]
/// struct Ping;
///
/// impl Event for Ping {
///     type Kind = &'static str;
///     fn kind(&self) -> &'static str { "ping" }
/// }
///
/// # tokio_test::block_on(async {
/// let bus = Publisher::<Ping>::new(PublisherConfig::new(1, 8));
/// let counter = Arc::new(AtomicUsize::new(0));
/// let seen = counter.clone();
/// bus.register("ping", handler_fn("count", move |_envelope: Envelope<Ping>| {
///     let counter = seen.clone();
///     async move {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }));
///
/// assert!(bus.trigger(Ping).await.is_empty());
/// assert_eq!(counter.load(Ordering::SeqCst), 1);
/// # });
/// ```
pub fn handler_fn<E, F, Fut>(name: impl Into<String>, function: F) -> FnHandler<F>
where
    E: Event,
    F: Fn(Envelope<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    FnHandler {
        name: name.into(),
        function,
    }
}

#[async_trait]
impl<E, F, Fut> EventHandler<E> for FnHandler<F>
where
    E: Event,
    F: Fn(Envelope<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, envelope: &Envelope<E>) -> Result<(), HandlerError> {
        (self.function)(envelope.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A single handler failure reported by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure<K> {
    /// Kind of the event being handled
    pub kind: K,

    /// Name of the failing handler
    pub handler: String,

    /// What went wrong
    pub error: HandlerError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::tests::TestEvent;

    struct Named;

    #[async_trait]
    impl EventHandler<TestEvent> for Named {
        async fn handle(&self, _envelope: &Envelope<TestEvent>) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = handler_fn("echo", |envelope: Envelope<TestEvent>| async move {
            match envelope.event() {
                TestEvent::Ping(n) if *n > 0 => Ok(()),
                other => Err(HandlerError::failed(format!("{:?}", other))),
            }
        });

        assert_eq!(EventHandler::<TestEvent>::name(&handler), "echo");
        assert!(handler.handle(&Envelope::new(TestEvent::Ping(1))).await.is_ok());
        assert!(handler.handle(&Envelope::new(TestEvent::Ping(0))).await.is_err());
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(EventHandler::<TestEvent>::name(&Named).ends_with("Named"));
    }
}
