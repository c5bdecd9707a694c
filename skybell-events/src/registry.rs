//! Handler registry

use crate::event::Event;
use crate::handler::EventHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Handlers<E> = Vec<Arc<dyn EventHandler<E>>>;

/// Ordered handlers per event kind.
///
/// Written a handful of times at startup and read on every dispatch, so the
/// map sits behind a reader/writer lock. Lookups return a snapshot and never
/// hold the lock while handlers run.
pub struct HandlerRegistry<E: Event> {
    handlers: RwLock<HashMap<E::Kind, Handlers<E>>>,
}

impl<E: Event> HandlerRegistry<E> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Append a handler for `kind`. Registration order is dispatch order.
    pub fn register<H>(&self, kind: E::Kind, handler: H)
    where
        H: EventHandler<E> + 'static,
    {
        self.register_arc(kind, Arc::new(handler));
    }

    /// Append an already shared handler for `kind`.
    pub fn register_arc(&self, kind: E::Kind, handler: Arc<dyn EventHandler<E>>) {
        let name = handler.name().to_string();
        let mut handlers = self.handlers.write();
        let list = handlers.entry(kind).or_default();
        list.push(handler);

        debug!(event = %kind, handler = %name, position = list.len(), "Registered event handler");
    }

    /// Handlers for `kind` in registration order; empty when none.
    pub fn lookup(&self, kind: E::Kind) -> Handlers<E> {
        self.handlers.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Get handler count for an event kind
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers.read().get(&kind).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().values().all(Vec::is_empty)
    }
}

impl<E: Event> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for HandlerRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<_, _> = handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::event::tests::{TestEvent, TestKind};
    use crate::event::Envelope;
    use crate::handler::handler_fn;

    fn noop(name: &str) -> impl EventHandler<TestEvent> + 'static {
        handler_fn(name, |_envelope: Envelope<TestEvent>| async {
            Ok::<(), HandlerError>(())
        })
    }

    #[test]
    fn test_lookup_unregistered_is_empty() {
        let registry = HandlerRegistry::<TestEvent>::new();
        assert!(registry.lookup(TestKind::Ping).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_preserves_registration_order() {
        let registry = HandlerRegistry::<TestEvent>::new();
        registry.register(TestKind::Ping, noop("first"));
        registry.register(TestKind::Ping, noop("second"));
        registry.register(TestKind::Pong, noop("other"));
        registry.register(TestKind::Ping, noop("third"));

        let names: Vec<_> = registry
            .lookup(TestKind::Ping)
            .iter()
            .map(|h| h.name().to_string())
            .collect();

        assert_eq!(names, ["first", "second", "third"]);
        assert_eq!(registry.handler_count(TestKind::Pong), 1);
    }

    #[test]
    fn test_concurrent_lookup_during_registration() {
        let registry = Arc::new(HandlerRegistry::<TestEvent>::new());
        registry.register(TestKind::Ping, noop("seed"));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(!registry.lookup(TestKind::Ping).is_empty());
                    }
                })
            })
            .collect();

        for i in 0..50 {
            registry.register(TestKind::Ping, noop(&format!("late-{}", i)));
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(registry.handler_count(TestKind::Ping), 51);
    }
}
