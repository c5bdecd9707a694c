//! Error types for the event bus.

use crate::publisher::PublisherState;
use thiserror::Error;

/// Result type for publisher lifecycle operations.
pub type PublisherResult<T> = Result<T, PublisherError>;

/// Publisher lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublisherError {
    /// `start` called on a publisher that is already running or draining
    #[error("Publisher already started (state: {0})")]
    AlreadyStarted(PublisherState),

    /// `start` called after the publisher was stopped
    #[error("Publisher has been stopped and cannot be restarted")]
    Stopped,

    /// `stop` called on a publisher that is not running
    #[error("Publisher is not running (state: {0})")]
    NotRunning(PublisherState),

    /// No Tokio runtime to spawn workers on
    #[error("No Tokio runtime available")]
    NoRuntime,
}

/// Event handler error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler received an event it does not handle: {0}")]
    UnexpectedEvent(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),

    #[error("Handler cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Wrap any displayable error as a handler failure.
    pub fn failed(err: impl std::fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }
}
