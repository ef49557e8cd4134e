//! Application state and worker initialization
//!
//! This module contains functions for wiring the application together at
//! startup: repositories, the queue backend, external service clients, and
//! the worker pool.

use std::sync::Arc;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::models::AppState;
use crate::queue::{create_queue_service, MockQueueDependencies, QueueService};
use crate::repositories::{
    InMemoryArticleRepository, InMemoryBusinessProfileRepository, InMemoryIdeaRepository,
    InMemoryIntegrationRepository, InMemoryJobRepository,
};
use crate::services::{HttpAgentService, WordPressClient};
use crate::utils::FieldEncryption;
use crate::workers::{IdeaGenerationHandler, PublishHandler, WorkerPool};

/// Builds the shared application state from configuration.
pub fn initialize_app_state(config: &ServerConfig) -> Result<AppState> {
    let agent = HttpAgentService::new(&config.agent)
        .wrap_err("Failed to initialize the content agent client")?;
    let cms = WordPressClient::new().wrap_err("Failed to initialize the WordPress client")?;
    let encryption =
        FieldEncryption::new().wrap_err("Failed to initialize field encryption")?;

    Ok(AppState {
        job_repo: Arc::new(InMemoryJobRepository::new()),
        idea_repo: Arc::new(InMemoryIdeaRepository::new()),
        article_repo: Arc::new(InMemoryArticleRepository::new()),
        business_repo: Arc::new(InMemoryBusinessProfileRepository::new()),
        integration_repo: Arc::new(InMemoryIntegrationRepository::new()),
        agent: Arc::new(agent),
        cms: Arc::new(cms),
        encryption,
    })
}

/// Creates the configured queue backend. The mock backend gets handles to
/// the same repositories the workers use, so inline jobs are visible to the
/// rest of the application.
pub async fn initialize_queue(
    config: &ServerConfig,
    state: &AppState,
) -> Arc<dyn QueueService> {
    let mock_deps = MockQueueDependencies {
        job_repo: state.job_repo.clone(),
        idea_repo: state.idea_repo.clone(),
        article_repo: state.article_repo.clone(),
    };
    create_queue_service(&config.queue, Some(mock_deps)).await
}

/// Spawns the worker pool. The returned receiver resolves once every worker
/// has stopped after `token` is cancelled.
pub fn initialize_workers(
    config: &ServerConfig,
    state: &AppState,
    queue: Arc<dyn QueueService>,
    token: CancellationToken,
) -> oneshot::Receiver<()> {
    let idea_handler = IdeaGenerationHandler::new(
        config.queue.idea_queue.clone(),
        state.job_repo.clone(),
        state.idea_repo.clone(),
        state.agent.clone(),
    );
    let publish_handler = PublishHandler::new(
        config.queue.publish_queue.clone(),
        state.article_repo.clone(),
        state.business_repo.clone(),
        state.integration_repo.clone(),
        state.agent.clone(),
        state.cms.clone(),
        state.encryption.clone(),
    );

    WorkerPool::new(
        queue,
        idea_handler,
        publish_handler,
        config.worker_count,
        config.max_retries,
    )
    .start(token)
}
