//! Worker pool lifecycle.
//!
//! Spawns a fixed number of identical workers per queue and exposes a
//! completion channel so shutdown can wait for in-flight messages to
//! settle before the process exits.

use std::sync::Arc;

use log::info;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::queue::QueueService;

use super::{IdeaGenerationHandler, JobHandler, PollWorker, PublishHandler};

pub struct WorkerPool {
    queue: Arc<dyn QueueService>,
    idea_handler: IdeaGenerationHandler,
    publish_handler: PublishHandler,
    workers_per_queue: usize,
    max_retries: u32,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn QueueService>,
        idea_handler: IdeaGenerationHandler,
        publish_handler: PublishHandler,
        workers_per_queue: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            queue,
            idea_handler,
            publish_handler,
            workers_per_queue: workers_per_queue.max(1),
            max_retries,
        }
    }

    /// Starts every worker. The returned receiver fires once all workers
    /// have observed the cancellation and drained their current message.
    pub fn start(self, token: CancellationToken) -> oneshot::Receiver<()> {
        let mut handles = Vec::with_capacity(self.workers_per_queue * 2);

        for _ in 0..self.workers_per_queue {
            handles.push(self.spawn(self.idea_handler.clone(), &token));
            handles.push(self.spawn(self.publish_handler.clone(), &token));
        }
        info!(
            "started {} workers ({} per queue)",
            handles.len(),
            self.workers_per_queue
        );

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            for handle in handles {
                // A worker that panicked is already stopped; nothing to wait for.
                let _ = handle.await;
            }
            info!("all workers stopped");
            let _ = done_tx.send(());
        });
        done_rx
    }

    fn spawn<H: JobHandler>(
        &self,
        handler: H,
        token: &CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let worker = PollWorker::new(self.queue.clone(), self.max_retries);
        let token = token.clone();
        tokio::spawn(worker.run(handler, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        InMemoryArticleRepository, InMemoryBusinessProfileRepository, InMemoryIdeaRepository,
        InMemoryIntegrationRepository, InMemoryJobRepository,
    };
    use crate::services::{MockAgentService, MockCmsService};
    use crate::utils::FieldEncryption;
    use std::time::Duration;

    fn pool(queue: Arc<dyn QueueService>, workers_per_queue: usize) -> WorkerPool {
        let agent = Arc::new(MockAgentService::new());
        let idea_handler = IdeaGenerationHandler::new(
            "idea-jobs",
            Arc::new(InMemoryJobRepository::new()),
            Arc::new(InMemoryIdeaRepository::new()),
            agent.clone(),
        );
        let publish_handler = PublishHandler::new(
            "publish-jobs",
            Arc::new(InMemoryArticleRepository::new()),
            Arc::new(InMemoryBusinessProfileRepository::new()),
            Arc::new(InMemoryIntegrationRepository::new()),
            agent,
            Arc::new(MockCmsService::new()),
            FieldEncryption::new_with_key(&[0u8; 32]),
        );
        WorkerPool::new(queue, idea_handler, publish_handler, workers_per_queue, 3)
    }

    #[tokio::test]
    async fn cancellation_stops_all_workers() {
        // The noop queue always returns an empty batch, so workers idle in
        // the poll loop until cancelled.
        let queue = Arc::new(crate::queue::NoopQueue::new());
        let token = CancellationToken::new();
        let done = pool(queue, 2).start(token.clone());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), done)
            .await
            .expect("workers did not stop in time")
            .expect("completion channel dropped");
    }
}
