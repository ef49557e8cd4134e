//! Idea-generation handler.
//!
//! Drives one `generate_ideas` job: loads the job row, asks the agent for
//! idea titles and summaries built from the stored business context, and
//! batch-inserts the results. Progress moves through fixed stages so the
//! wizard UI can show movement during the slow agent call.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};

use crate::constants::IDEA_SUMMARY_MAX_LEN;
use crate::jobs::{GenerateIdeasMessage, JobEnvelope};
use crate::models::{ArticleIdea, ArticleJob, RepositoryError};
use crate::repositories::{ArticleJobRepository, IdeaRepository};
use crate::services::{AgentService, IdeaGenerationRequest};
use crate::utils::truncate_at_word;

use super::{HandlerError, JobHandler};

#[derive(Clone)]
pub struct IdeaGenerationHandler {
    queue_name: String,
    job_repo: Arc<dyn ArticleJobRepository>,
    idea_repo: Arc<dyn IdeaRepository>,
    agent: Arc<dyn AgentService>,
}

impl IdeaGenerationHandler {
    pub fn new(
        queue_name: impl Into<String>,
        job_repo: Arc<dyn ArticleJobRepository>,
        idea_repo: Arc<dyn IdeaRepository>,
        agent: Arc<dyn AgentService>,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            job_repo,
            idea_repo,
            agent,
        }
    }

    async fn load_job(&self, message: &GenerateIdeasMessage) -> Result<ArticleJob, HandlerError> {
        self.job_repo
            .find_by_id(message.job_id)
            .await
            .map_err(repo_failure)?
            .ok_or_else(|| HandlerError::MissingRecord(format!("job {}", message.job_id)))
    }

    async fn advance_progress(&self, mut job: ArticleJob, progress: u8) -> Result<ArticleJob, HandlerError> {
        job.set_processing(progress);
        self.job_repo.update(job).await.map_err(repo_failure)
    }
}

fn repo_failure(e: RepositoryError) -> HandlerError {
    HandlerError::Failed(e.to_string())
}

#[async_trait]
impl JobHandler for IdeaGenerationHandler {
    type Message = GenerateIdeasMessage;

    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn accept(&self, envelope: JobEnvelope) -> Option<Self::Message> {
        match envelope {
            JobEnvelope::GenerateIdeas(message) => Some(message),
            _ => None,
        }
    }

    async fn handle(&self, message: &Self::Message, attempt: u32) -> Result<(), HandlerError> {
        let job = self.load_job(message).await?;

        // A redelivered message for a settled job is a duplicate.
        if job.is_terminal() {
            info!("job {} already {}, skipping", job.id, job.status);
            return Ok(());
        }

        if attempt > 0 {
            info!("retrying idea generation for job {} (attempt {attempt})", job.id);
        }

        let job = self.advance_progress(job, 10).await?;

        let request = IdeaGenerationRequest {
            business_description: job.payload.business_description.clone(),
            competitors: job.payload.competitors.clone(),
            count: message.count.max(1),
            objectives: job.payload.objectives.clone(),
            location: job.payload.location.clone(),
        };
        let job = self.advance_progress(job, 30).await?;

        let generated = self
            .agent
            .generate_ideas(request)
            .await
            .map_err(|e| HandlerError::Failed(format!("agent call failed: {e}")))?;
        if generated.is_empty() {
            return Err(HandlerError::Failed("agent returned no ideas".into()));
        }

        let mut job = self.advance_progress(job, 60).await?;

        let ideas: Vec<ArticleIdea> = generated
            .into_iter()
            .map(|idea| {
                ArticleIdea::new(
                    job.user_id,
                    job.id,
                    idea.title,
                    truncate_at_word(&idea.summary, IDEA_SUMMARY_MAX_LEN),
                )
            })
            .collect();
        let count = ideas.len();
        self.idea_repo
            .create_batch(ideas)
            .await
            .map_err(repo_failure)?;

        job.set_completed();
        self.job_repo.update(job).await.map_err(repo_failure)?;
        info!("job {} completed with {count} ideas", message.job_id);
        Ok(())
    }

    async fn mark_failed(&self, message: &Self::Message, reason: &str) {
        match self.job_repo.find_by_id(message.job_id).await {
            Ok(Some(mut job)) => {
                job.set_failed(reason);
                if let Err(e) = self.job_repo.update(job).await {
                    error!("could not mark job {} failed: {e}", message.job_id);
                }
            }
            Ok(None) => {}
            Err(e) => error!("could not load job {} to mark it failed: {e}", message.job_id),
        }
    }
}
