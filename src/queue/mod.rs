//! Queue abstraction over a lease-based message broker.
//!
//! The worker-facing contract is the same for every backend: messages are
//! received under a visibility-timeout lease, the lease can be extended
//! while a handler is retrying, and deleting the message is the
//! acknowledgement boundary. Backends: AWS SQS (production), an inline mock
//! (development) and a no-op (messaging disabled).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

mod factory;
pub use factory::*;

mod mock;
pub use mock::*;

mod noop;
pub use noop::*;

mod sqs;
pub use sqs::*;

/// Broker-imposed cap on batch sends and receives.
pub const MAX_BATCH_SIZE: usize = 10;

/// Upper bound on a lease extension, in seconds (12 hours).
pub const MAX_LEASE_EXTENSION_SECS: u32 = 43_200;

/// A message received under lease. Exists only inside the broker and the
/// worker's processing scope; never persisted by the application.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub body: Vec<u8>,
    /// Lease handle used to delete the message or extend its lease.
    pub receipt_handle: String,
    /// How many times the broker has delivered this message.
    pub receive_count: u32,
    pub first_received: DateTime<Utc>,
}

/// One failed entry of a batch send.
#[derive(Debug, Clone)]
pub struct BatchEntryFailure {
    pub index: usize,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid queue input: {0}")]
    InvalidInput(String),

    #[error("failed to send to queue {queue}: {reason}")]
    SendFailed { queue: String, reason: String },

    #[error("batch send to queue {queue}: {} of {total} entries failed", .failures.len())]
    BatchPartialFailure {
        queue: String,
        total: usize,
        failures: Vec<BatchEntryFailure>,
    },

    #[error("failed to receive from queue {queue}: {reason}")]
    ReceiveFailed { queue: String, reason: String },

    #[error("failed to delete message from queue {queue}: {reason}")]
    DeleteFailed { queue: String, reason: String },

    #[error("failed to extend lease on queue {queue}: {reason}")]
    LeaseExtensionFailed { queue: String, reason: String },

    #[error("queue {queue} failed its health check: {reason}")]
    Unhealthy { queue: String, reason: String },
}

/// Uniform contract over the message broker.
///
/// Delivery is at-least-once: a lease that expires before the message is
/// deleted makes the message visible again, so handlers must be idempotent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Enqueues one opaque payload.
    async fn send(&self, queue_name: &str, body: Vec<u8>) -> Result<(), QueueError>;

    /// Enqueues up to [`MAX_BATCH_SIZE`] payloads. Partial failures are
    /// reported per entry via [`QueueError::BatchPartialFailure`].
    async fn send_batch(&self, queue_name: &str, bodies: Vec<Vec<u8>>) -> Result<(), QueueError>;

    /// Long-poll receive of up to `max_messages` (clamped to 1..=10)
    /// messages, each under a fresh lease. No ordering guarantee.
    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
    ) -> Result<Vec<Message>, QueueError>;

    /// Acknowledges and permanently removes a message. Idempotent:
    /// deleting an expired or already-deleted handle is not fatal.
    async fn delete(&self, queue_name: &str, receipt_handle: &str) -> Result<(), QueueError>;

    /// Lengthens the invisibility window of a held message so a slow
    /// multi-attempt handler does not race a concurrent redelivery.
    async fn extend_lease(
        &self,
        queue_name: &str,
        receipt_handle: &str,
        seconds: u32,
    ) -> Result<(), QueueError>;

    /// Cheap liveness probe; resolves the queue without draining it.
    async fn health_check(&self, queue_name: &str) -> Result<(), QueueError>;
}
