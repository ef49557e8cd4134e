//! Job producer, the single seam through which the application enqueues
//! work. Handlers depend on [`JobProducerTrait`] so tests can assert on
//! produced jobs with a mock instead of a broker.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::queue::{QueueError, QueueService, MAX_BATCH_SIZE};

use super::{EnvelopeError, GenerateIdeasMessage, JobEnvelope, PublishMessage};

#[derive(Debug, Error)]
pub enum JobProducerError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("cannot enqueue {0} publish jobs at once, the limit is {MAX_BATCH_SIZE}")]
    BatchTooLarge(usize),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobProducerTrait: Send + Sync {
    async fn produce_generate_ideas_job(
        &self,
        message: GenerateIdeasMessage,
    ) -> Result<(), JobProducerError>;

    async fn produce_publish_job(&self, message: PublishMessage) -> Result<(), JobProducerError>;

    /// Enqueues up to [`MAX_BATCH_SIZE`] publish jobs in one broker call.
    async fn produce_publish_jobs(
        &self,
        messages: Vec<PublishMessage>,
    ) -> Result<(), JobProducerError>;
}

pub struct JobProducer {
    queue: Arc<dyn QueueService>,
    idea_queue: String,
    publish_queue: String,
}

impl JobProducer {
    pub fn new(
        queue: Arc<dyn QueueService>,
        idea_queue: impl Into<String>,
        publish_queue: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            idea_queue: idea_queue.into(),
            publish_queue: publish_queue.into(),
        }
    }
}

#[async_trait]
impl JobProducerTrait for JobProducer {
    async fn produce_generate_ideas_job(
        &self,
        message: GenerateIdeasMessage,
    ) -> Result<(), JobProducerError> {
        let job_id = message.job_id;
        let body = JobEnvelope::GenerateIdeas(message).encode()?;
        self.queue.send(&self.idea_queue, body).await?;
        info!("enqueued idea generation job {job_id}");
        Ok(())
    }

    async fn produce_publish_job(&self, message: PublishMessage) -> Result<(), JobProducerError> {
        let article_id = message.article_id;
        let body = JobEnvelope::Publish(message).encode()?;
        self.queue.send(&self.publish_queue, body).await?;
        info!("enqueued publish job for article {article_id}");
        Ok(())
    }

    async fn produce_publish_jobs(
        &self,
        messages: Vec<PublishMessage>,
    ) -> Result<(), JobProducerError> {
        if messages.len() > MAX_BATCH_SIZE {
            return Err(JobProducerError::BatchTooLarge(messages.len()));
        }
        let count = messages.len();
        let bodies = messages
            .into_iter()
            .map(|m| JobEnvelope::Publish(m).encode())
            .collect::<Result<Vec<_>, _>>()?;
        self.queue.send_batch(&self.publish_queue, bodies).await?;
        info!("enqueued batch of {count} publish jobs");
        Ok(())
    }
}
