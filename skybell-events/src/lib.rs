//! In-process event bus for Skybell.
//!
//! A [`Publisher`] owns a bounded queue drained by a fixed pool of worker
//! tasks. Handlers are registered per event kind and always run in
//! registration order.
//!
//! ## Features
//!
//! - **Closed event sets**: an application's events are one enum whose
//!   variant decides the routing kind
//! - **Synchronous dispatch**: [`Publisher::trigger`] runs handlers on the
//!   caller and reports every failure
//! - **Fire-and-forget dispatch**: [`Publisher::trigger_async`] never blocks
//!   the caller, falling back to bounded overflow helpers when the queue is
//!   full
//! - **Graceful shutdown**: [`Publisher::stop`] waits for in-flight events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skybell_events::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Kind { Greeted }
//!
//! impl std::fmt::Display for Kind { /* ... */ }
//!
//! #[derive(Debug, Clone)]
//! enum AppEvent { Greeted(String) }
//!
//! impl Event for AppEvent {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { Kind::Greeted }
//! }
//!
//! let publisher = Publisher::new(PublisherConfig::new(4, 100));
//! publisher.register(Kind::Greeted, handler_fn("log", |envelope: Envelope<AppEvent>| async move {
//!     tracing::info!(event = ?envelope.event(), "greeted");
//!     Ok(())
//! }));
//!
//! publisher.start()?;
//! publisher.trigger_async(AppEvent::Greeted("alice".into()));
//! publisher.stop().await?;
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod publisher;
pub mod registry;

pub use error::{HandlerError, PublisherError, PublisherResult};
pub use event::{Envelope, Event, EventMetadata};
pub use handler::{EventHandler, FnHandler, HandlerFailure, handler_fn};
pub use publisher::{
    DEFAULT_OVERFLOW_BUDGET, DEFAULT_OVERFLOW_TIMEOUT, DEFAULT_QUEUE_CAPACITY, Publisher,
    PublisherConfig, PublisherState, PublisherStats,
};
pub use registry::HandlerRegistry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{HandlerError, PublisherError, PublisherResult};
    pub use crate::event::{Envelope, Event, EventMetadata};
    pub use crate::handler::{EventHandler, HandlerFailure, handler_fn};
    pub use crate::publisher::{Publisher, PublisherConfig, PublisherState};
    pub use tokio_util::sync::CancellationToken;
}
