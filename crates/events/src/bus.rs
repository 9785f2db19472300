//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **transport layer** for events after the state change they
//! describe has been committed. It is intentionally lightweight:
//!
//! - **Transport-agnostic**: works with in-memory channels, message queues, etc.
//! - **At-least-once delivery**: events may be delivered multiple times;
//!   consumers must be idempotent
//! - **No persistence**: the bus distributes, it does not store - the
//!   repositories are the source of truth
//!
//! Publication is fire-and-forget from the producer's point of view: a
//! failed publish is surfaced to the caller, but the committed state change
//! is never rolled back because of it.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of all events published to the bus
/// (broadcast semantics). Subscriptions are designed for single-threaded
/// consumption; use one per consumer thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ## Delivery Guarantees
///
/// - Events may be delivered multiple times (retries, crashes, etc.)
/// - Ordering between concurrent publishers is not guaranteed
/// - Consumers must be idempotent
///
/// ## Error Handling
///
/// `publish()` can fail. Failures are surfaced to the caller, which decides
/// whether to retry; since the underlying state change is already durable,
/// retrying publication is safe.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
