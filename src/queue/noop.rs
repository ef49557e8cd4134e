//! Queue backend that accepts and discards everything.
//!
//! Used when no broker is configured, and as the degraded fallback when the
//! configured backend fails its startup health check. Jobs enqueued here are
//! logged and dropped, so the rest of the application keeps working.

use async_trait::async_trait;
use log::warn;

use super::{Message, QueueError, QueueService};

#[derive(Debug, Default, Clone)]
pub struct NoopQueue;

impl NoopQueue {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueueService for NoopQueue {
    async fn send(&self, queue_name: &str, _body: Vec<u8>) -> Result<(), QueueError> {
        warn!("noop queue dropping message for {queue_name}");
        Ok(())
    }

    async fn send_batch(&self, queue_name: &str, bodies: Vec<Vec<u8>>) -> Result<(), QueueError> {
        warn!(
            "noop queue dropping batch of {} messages for {queue_name}",
            bodies.len()
        );
        Ok(())
    }

    async fn receive(
        &self,
        _queue_name: &str,
        _max_messages: usize,
    ) -> Result<Vec<Message>, QueueError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _queue_name: &str, _receipt_handle: &str) -> Result<(), QueueError> {
        Ok(())
    }

    async fn extend_lease(
        &self,
        _queue_name: &str,
        _receipt_handle: &str,
        _seconds: u32,
    ) -> Result<(), QueueError> {
        Ok(())
    }

    async fn health_check(&self, _queue_name: &str) -> Result<(), QueueError> {
        Ok(())
    }
}
