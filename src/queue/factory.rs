//! Queue backend selection.
//!
//! The backend is chosen by configuration, not probed. If the configured
//! backend cannot be reached at startup the factory degrades to the noop
//! backend instead of failing the whole process, so the web tier stays up
//! with job submission disabled.

use std::sync::Arc;

use log::{error, info};

use crate::config::{QueueBackend, QueueConfig};

use super::{MockQueue, MockQueueDependencies, NoopQueue, QueueService, SqsQueue};

pub async fn create_queue_service(
    config: &QueueConfig,
    mock_deps: Option<MockQueueDependencies>,
) -> Arc<dyn QueueService> {
    match config.backend {
        QueueBackend::Sqs => {
            let queue = SqsQueue::connect(config).await;
            for name in [&config.idea_queue, &config.publish_queue] {
                if let Err(e) = queue.health_check(name).await {
                    error!("queue {name} is unreachable, degrading to the noop backend: {e}");
                    return Arc::new(NoopQueue::new());
                }
            }
            info!("queue backend: sqs");
            Arc::new(queue)
        }
        QueueBackend::Mock => match mock_deps {
            Some(deps) => {
                info!("queue backend: mock (jobs run inline)");
                Arc::new(MockQueue::new(deps, config.mock_processing_delay))
            }
            None => {
                error!("mock queue backend selected without repositories, using noop");
                Arc::new(NoopQueue::new())
            }
        },
        QueueBackend::Noop => {
            info!("queue backend: noop (jobs are dropped)");
            Arc::new(NoopQueue::new())
        }
    }
}
