//! Event publisher: a bounded queue drained by a fixed worker pool.

use crate::error::{HandlerError, PublisherError, PublisherResult};
use crate::event::{Envelope, Event};
use crate::handler::{EventHandler, HandlerFailure};
use crate::registry::HandlerRegistry;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long `trigger_async` keeps watching an overflow helper.
pub const DEFAULT_OVERFLOW_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of overflow helpers alive at once.
pub const DEFAULT_OVERFLOW_BUDGET: usize = 64;

/// Publisher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Number of worker loops; 0 means one per available CPU
    pub workers: usize,

    /// Bounded queue capacity; 0 means [`DEFAULT_QUEUE_CAPACITY`]
    pub queue_capacity: usize,

    /// Wait limit for an overflow helper
    pub overflow_timeout: Duration,

    /// Concurrent overflow helpers allowed; 0 disables the overflow path
    pub overflow_budget: usize,
}

impl PublisherConfig {
    /// Create a configuration, resolving zero values to defaults.
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers,
            queue_capacity,
            ..Self::default()
        }
        .normalized()
    }

    /// Set the overflow wait limit
    pub fn overflow_timeout(mut self, timeout: Duration) -> Self {
        self.overflow_timeout = timeout;
        self
    }

    /// Set the overflow helper budget
    pub fn overflow_budget(mut self, budget: usize) -> Self {
        self.overflow_budget = budget;
        self
    }

    fn normalized(mut self) -> Self {
        if self.workers == 0 {
            self.workers = available_workers();
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        self
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            workers: available_workers(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_timeout: DEFAULT_OVERFLOW_TIMEOUT,
            overflow_budget: DEFAULT_OVERFLOW_BUDGET,
        }
    }
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Publisher lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PublisherState {
    /// Queue allocated, no workers yet
    Created = 0,
    /// Workers are consuming the queue
    Running = 1,
    /// Stop requested, waiting for workers to finish
    Draining = 2,
    /// Workers gone and queue closed
    Stopped = 3,
}

impl PublisherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for PublisherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Point-in-time publisher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Events accepted onto the queue
    pub enqueued: u64,
    /// Events handed to an overflow helper
    pub overflowed: u64,
    /// Events discarded without dispatch
    pub dropped: u64,
    /// Events whose handler chain ran to the end
    pub processed: u64,
    /// Individual handler failures
    pub handler_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    overflowed: AtomicU64,
    dropped: AtomicU64,
    processed: AtomicU64,
    handler_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

/// In-process event publisher.
///
/// `trigger` runs handlers on the caller. `trigger_async` never blocks: it
/// enqueues when there is room, drops once shutdown has begun, and otherwise
/// hands the event to a bounded set of overflow helpers.
///
/// The handle is cheap to clone; all clones share one queue and worker pool.
///
/// # Examples
///
/// ```rust,ignore
/// let publisher = Publisher::new(PublisherConfig::new(4, 100));
/// publisher.register(Kind::UserSubscribed, ConfirmationHandler::new(...));
/// publisher.start()?;
///
/// publisher.trigger_async(AppEvent::UserSubscribed(subscription));
///
/// publisher.stop().await?;
/// ```
pub struct Publisher<E: Event> {
    inner: Arc<Inner<E>>,
}

struct Inner<E: Event> {
    config: PublisherConfig,
    registry: HandlerRegistry<E>,
    sender: mpsc::Sender<Envelope<E>>,
    receiver: Mutex<mpsc::Receiver<Envelope<E>>>,
    state: AtomicU8,
    shutdown: CancellationToken,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    overflow: Arc<Semaphore>,
    counters: Counters,
}

impl<E: Event> Publisher<E> {
    /// Create a publisher. No workers run until [`Publisher::start`].
    pub fn new(config: PublisherConfig) -> Self {
        let config = config.normalized();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            overflow_budget = config.overflow_budget,
            "Event publisher created"
        );

        Self {
            inner: Arc::new(Inner {
                overflow: Arc::new(Semaphore::new(config.overflow_budget)),
                config,
                registry: HandlerRegistry::new(),
                sender,
                receiver: Mutex::new(receiver),
                state: AtomicU8::new(PublisherState::Created as u8),
                shutdown: CancellationToken::new(),
                workers: parking_lot::Mutex::new(Vec::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// Append a handler for `kind`.
    pub fn register<H>(&self, kind: E::Kind, handler: H)
    where
        H: EventHandler<E> + 'static,
    {
        self.inner.registry.register(kind, handler);
    }

    pub fn registry(&self) -> &HandlerRegistry<E> {
        &self.inner.registry
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.inner.config
    }

    pub fn state(&self) -> PublisherState {
        PublisherState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> PublisherStats {
        self.inner.counters.snapshot()
    }

    /// Wrap an event in an envelope tied to this publisher's shutdown signal.
    pub fn envelope(&self, event: E) -> Envelope<E> {
        Envelope::new(event).with_cancellation(self.inner.shutdown.child_token())
    }

    /// Spawn the worker pool.
    pub fn start(&self) -> PublisherResult<()> {
        let runtime = Handle::try_current().map_err(|_| PublisherError::NoRuntime)?;

        if let Err(current) = self.inner.transition(PublisherState::Created, PublisherState::Running) {
            warn!(state = %current, "Event publisher start rejected");
            return Err(match current {
                PublisherState::Stopped => PublisherError::Stopped,
                other => PublisherError::AlreadyStarted(other),
            });
        }

        let mut workers = self.inner.workers.lock();
        for id in 0..self.inner.config.workers {
            let inner = Arc::clone(&self.inner);
            workers.push(runtime.spawn(inner.work(id)));
        }

        info!(
            workers = self.inner.config.workers,
            queue_capacity = self.inner.config.queue_capacity,
            "Event publisher started"
        );
        Ok(())
    }

    /// Stop the worker pool.
    ///
    /// Signals shutdown, waits for every worker to finish the event it is
    /// processing, then closes the queue. Events still buffered are discarded.
    pub async fn stop(&self) -> PublisherResult<()> {
        if let Err(current) = self.inner.transition(PublisherState::Running, PublisherState::Draining) {
            warn!(state = %current, "Event publisher stop rejected");
            return Err(PublisherError::NotRunning(current));
        }

        info!("Event publisher draining");
        self.inner.shutdown.cancel();

        let workers = std::mem::take(&mut *self.inner.workers.lock());
        for (id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = id, error = %e, "Event worker terminated abnormally");
            }
        }

        let mut receiver = self.inner.receiver.lock().await;
        receiver.close();
        let mut discarded = 0u64;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        drop(receiver);

        if discarded > 0 {
            self.inner
                .counters
                .dropped
                .fetch_add(discarded, Ordering::Relaxed);
            warn!(discarded, "Discarded undelivered events at shutdown");
        }

        self.inner
            .state
            .store(PublisherState::Stopped as u8, Ordering::Release);
        info!("Event publisher stopped");
        Ok(())
    }

    /// Run every handler for the event on the calling task.
    ///
    /// Handlers run in registration order and a failure does not stop the
    /// ones after it. Returns every failure; empty when all succeeded or no
    /// handler is registered.
    pub async fn trigger(&self, event: E) -> Vec<HandlerFailure<E::Kind>> {
        self.trigger_envelope(self.envelope(event)).await
    }

    /// [`Publisher::trigger`] with a caller-built envelope.
    pub async fn trigger_envelope(&self, envelope: Envelope<E>) -> Vec<HandlerFailure<E::Kind>> {
        let failures = self.inner.dispatch(&envelope).await;
        if !failures.is_empty() {
            debug!(event = %envelope.kind(), failures = failures.len(), "Synchronous dispatch reported failures");
        }
        failures
    }

    /// Submit an event without waiting for its handlers.
    pub fn trigger_async(&self, event: E) {
        self.submit(self.envelope(event));
    }

    /// [`Publisher::trigger_async`] with a caller-built envelope.
    pub fn submit(&self, envelope: Envelope<E>) {
        let kind = envelope.kind();

        if self.inner.shutdown.is_cancelled() {
            self.inner.discard(kind, "publisher is shutting down");
            return;
        }

        match self.inner.sender.try_send(envelope) {
            Ok(()) => {
                self.inner.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                trace!(event = %kind, "Event enqueued");
            }
            Err(TrySendError::Full(envelope)) => Inner::spill(&self.inner, envelope),
            Err(TrySendError::Closed(_)) => self.inner.discard(kind, "queue is closed"),
        }
    }
}

impl<E: Event> Clone for Publisher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Event> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

impl<E: Event> Inner<E> {
    fn transition(&self, from: PublisherState, to: PublisherState) -> Result<(), PublisherState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(PublisherState::from_u8)
    }

    async fn work(self: Arc<Self>, id: usize) {
        debug!(worker = id, "Event worker started");

        loop {
            // Shutdown is only observed between events.
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = self.next_envelope() => next,
            };
            let Some(envelope) = next else { break };

            for failure in self.dispatch(&envelope).await {
                error!(
                    worker = id,
                    event = %failure.kind,
                    handler = %failure.handler,
                    error = %failure.error,
                    "Event handler failed"
                );
            }
        }

        debug!(worker = id, "Event worker stopped");
    }

    async fn next_envelope(&self) -> Option<Envelope<E>> {
        self.receiver.lock().await.recv().await
    }

    async fn dispatch(&self, envelope: &Envelope<E>) -> Vec<HandlerFailure<E::Kind>> {
        let kind = envelope.kind();
        let handlers = self.registry.lookup(kind);

        if handlers.is_empty() {
            debug!(event = %kind, id = %envelope.metadata().id, "No handlers registered for event");
        }

        let mut failures = Vec::new();
        for handler in handlers {
            let outcome = AssertUnwindSafe(handler.handle(envelope)).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => HandlerError::Panicked(panic_message(panic.as_ref())),
            };

            self.counters.handler_failures.fetch_add(1, Ordering::Relaxed);
            failures.push(HandlerFailure {
                kind,
                handler: handler.name().to_string(),
                error,
            });
        }

        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        failures
    }

    fn discard(&self, kind: E::Kind, reason: &'static str) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(event = %kind, reason, "Dropping event");
    }

    /// Dispatch on a detached helper when the queue is full.
    ///
    /// The helper holds a budget permit until its handler chain finishes. A
    /// watcher waits at most `overflow_timeout` for it and then gives up
    /// waiting; the helper itself is left to finish.
    fn spill(this: &Arc<Self>, envelope: Envelope<E>) {
        let kind = envelope.kind();

        let Ok(runtime) = Handle::try_current() else {
            this.discard(kind, "no runtime for overflow helper");
            return;
        };
        let Ok(permit) = Arc::clone(&this.overflow).try_acquire_owned() else {
            this.discard(kind, "overflow budget exhausted");
            return;
        };

        this.counters.overflowed.fetch_add(1, Ordering::Relaxed);
        warn!(event = %kind, "Event queue full, dispatching on overflow helper");

        let inner = Arc::clone(this);
        let mut helper = runtime.spawn(async move {
            let _permit = permit;
            inner.dispatch(&envelope).await
        });

        let timeout = this.config.overflow_timeout;
        let shutdown = this.shutdown.clone();
        runtime.spawn(async move {
            tokio::select! {
                joined = &mut helper => match joined {
                    Ok(failures) => {
                        for failure in failures {
                            error!(
                                event = %failure.kind,
                                handler = %failure.handler,
                                error = %failure.error,
                                "Event handler failed on overflow helper"
                            );
                        }
                    }
                    Err(e) => error!(event = %kind, error = %e, "Overflow helper terminated abnormally"),
                },
                _ = tokio::time::sleep(timeout) => {
                    warn!(event = %kind, timeout_ms = timeout.as_millis() as u64, "Overflow helper timed out, no longer waiting");
                }
                _ = shutdown.cancelled() => {
                    debug!(event = %kind, "Stopped waiting for overflow helper at shutdown");
                }
            }
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
