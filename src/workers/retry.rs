//! Poll loop and retry protocol shared by every worker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::constants::{
    LEASE_EXTENSION_STEP_SECS, LOOKUP_REDELIVERY_LIMIT, RECEIVE_BATCH_SIZE, RECEIVE_TIMEOUT,
    RETRY_BACKOFF_BASE,
};
use crate::jobs::JobEnvelope;
use crate::queue::{Message, QueueService, MAX_LEASE_EXTENSION_SECS};

/// Pause after a failed receive call, so a broken broker connection does
/// not spin the loop.
const RECEIVE_FAILURE_PAUSE: Duration = Duration::from_secs(1);

/// Pause after an empty batch. Brokers that long-poll make this moot, but
/// the inline backends return immediately.
const EMPTY_POLL_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The database row the message points at does not exist. Retrying the
    /// attempt cannot help; the redelivery policy decides what happens.
    #[error("{0} not found")]
    MissingRecord(String),
    /// The attempt failed but a later one may succeed.
    #[error("{0}")]
    Failed(String),
}

/// Work performed on one queue's messages. The poll loop owns decoding,
/// lease management, retries, and deletion; the handler owns the domain
/// side effects.
#[async_trait]
pub trait JobHandler: Clone + Send + Sync + 'static {
    type Message: Send + Sync;

    fn queue_name(&self) -> &str;

    /// Pulls this handler's message out of the envelope. `None` means the
    /// message belongs to a different job family and is dropped.
    fn accept(&self, envelope: JobEnvelope) -> Option<Self::Message>;

    async fn handle(&self, message: &Self::Message, attempt: u32) -> Result<(), HandlerError>;

    /// Records the terminal failure once every attempt has been spent.
    async fn mark_failed(&self, message: &Self::Message, reason: &str);
}

/// Exponential backoff for the given zero-based attempt index.
pub fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BACKOFF_BASE * 2u32.saturating_pow(attempt)
}

/// Lease granted before the given zero-based attempt, capped at the
/// broker's limit. Later attempts get longer leases because the backoff
/// preceding them has already consumed part of the previous lease.
pub fn lease_extension_secs(attempt: u32) -> u32 {
    LEASE_EXTENSION_STEP_SECS
        .saturating_mul(attempt + 1)
        .min(MAX_LEASE_EXTENSION_SECS)
}

/// A single polling worker bound to one queue.
pub struct PollWorker {
    id: String,
    queue: Arc<dyn QueueService>,
    max_retries: u32,
}

enum Outcome {
    /// Processing is settled; delete the message.
    Settled,
    /// Leave the message leased so the broker redelivers it.
    Redeliver,
}

impl PollWorker {
    pub fn new(queue: Arc<dyn QueueService>, max_retries: u32) -> Self {
        Self {
            id: format!("worker-{}", &Uuid::new_v4().simple().to_string()[..8]),
            queue,
            max_retries: max_retries.max(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Polls the handler's queue until the token is cancelled.
    ///
    /// Cancellation is observed only at suspension points between messages:
    /// the receive wait, the idle pauses, and the inter-attempt backoff. A
    /// message whose processing has started is always driven to a settled
    /// outcome, so an in-flight external call is never dropped mid-attempt.
    pub async fn run<H: JobHandler>(self, handler: H, token: CancellationToken) {
        info!("{} polling queue {}", self.id, handler.queue_name());
        loop {
            let received = tokio::select! {
                _ = token.cancelled() => break,
                batch = self.next_batch(handler.queue_name()) => batch,
            };
            for message in received {
                self.process_message(&handler, message, &token).await;
                if token.is_cancelled() {
                    break;
                }
            }
            if token.is_cancelled() {
                break;
            }
        }
        info!("{} stopped", self.id);
    }

    /// Waits for the next batch. The pauses after a failed or empty receive
    /// live here so the caller's cancellation race covers every idle wait.
    async fn next_batch(&self, queue_name: &str) -> Vec<Message> {
        match timeout(
            RECEIVE_TIMEOUT,
            self.queue.receive(queue_name, RECEIVE_BATCH_SIZE),
        )
        .await
        {
            Err(_) => {
                warn!("{} receive on {queue_name} timed out", self.id);
                Vec::new()
            }
            Ok(Err(e)) => {
                error!("{} receive on {queue_name} failed: {e}", self.id);
                sleep(RECEIVE_FAILURE_PAUSE).await;
                Vec::new()
            }
            Ok(Ok(messages)) => {
                if messages.is_empty() {
                    sleep(EMPTY_POLL_PAUSE).await;
                }
                messages
            }
        }
    }

    async fn process_message<H: JobHandler>(
        &self,
        handler: &H,
        message: Message,
        token: &CancellationToken,
    ) {
        let queue_name = handler.queue_name();

        let envelope = match JobEnvelope::decode(&message.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Redelivering garbage cannot fix it.
                warn!(
                    "{} dropping undecodable message {} from {queue_name}: {e}",
                    self.id, message.id
                );
                self.delete(queue_name, &message).await;
                return;
            }
        };

        let Some(job) = handler.accept(envelope) else {
            warn!(
                "{} dropping message {} from {queue_name}: wrong job family",
                self.id, message.id
            );
            self.delete(queue_name, &message).await;
            return;
        };

        match self.attempt_with_retries(handler, &job, &message, token).await {
            Outcome::Settled => self.delete(queue_name, &message).await,
            Outcome::Redeliver => debug!(
                "{} releasing message {} for redelivery",
                self.id, message.id
            ),
        }
    }

    async fn attempt_with_retries<H: JobHandler>(
        &self,
        handler: &H,
        job: &H::Message,
        message: &Message,
        token: &CancellationToken,
    ) -> Outcome {
        let queue_name = handler.queue_name();
        let mut attempt: u32 = 0;
        loop {
            if let Err(e) = self
                .queue
                .extend_lease(
                    queue_name,
                    &message.receipt_handle,
                    lease_extension_secs(attempt),
                )
                .await
            {
                warn!("{} could not extend lease on {}: {e}", self.id, message.id);
            }

            let error = match handler.handle(job, attempt).await {
                Ok(()) => return Outcome::Settled,
                Err(e) => e,
            };

            match error {
                HandlerError::MissingRecord(what) => {
                    // The enqueue transaction may not have committed yet.
                    // Give the message a few deliveries before giving up.
                    if message.receive_count < LOOKUP_REDELIVERY_LIMIT {
                        debug!(
                            "{} found no {what} for message {} (delivery {}), will retry later",
                            self.id, message.id, message.receive_count
                        );
                        return Outcome::Redeliver;
                    }
                    warn!(
                        "{} found no {what} for message {} after {} deliveries, dropping",
                        self.id, message.id, message.receive_count
                    );
                    handler.mark_failed(job, &format!("{what} not found")).await;
                    return Outcome::Settled;
                }
                HandlerError::Failed(reason) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        error!(
                            "{} giving up on message {} after {attempt} attempts: {reason}",
                            self.id, message.id
                        );
                        handler.mark_failed(job, &reason).await;
                        return Outcome::Settled;
                    }
                    warn!(
                        "{} attempt {attempt} on message {} failed: {reason}",
                        self.id, message.id
                    );
                    let delay = backoff_delay(attempt - 1);
                    tokio::select! {
                        _ = token.cancelled() => return Outcome::Redeliver,
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn delete(&self, queue_name: &str, message: &Message) {
        if let Err(e) = self.queue.delete(queue_name, &message.receipt_handle).await {
            error!("{} failed to delete message {}: {e}", self.id, message.id);
        }
    }
}
