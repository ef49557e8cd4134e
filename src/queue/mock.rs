//! In-process queue backend for local development.
//!
//! Instead of brokering messages, this backend decodes each job on `send`
//! and executes a canned version of it on a background task, writing staged
//! progress updates so the front end behaves as it would against real
//! workers. No broker is involved, so `receive` always returns nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use uuid::Uuid;

use crate::jobs::JobEnvelope;
use crate::models::{ArticleIdea, JobStatus};
use crate::repositories::{ArticleJobRepository, ArticleRepository, IdeaRepository};
use crate::utils::slugify;

use super::{Message, QueueError, QueueService};

/// Repositories the mock backend writes job results into.
#[derive(Clone)]
pub struct MockQueueDependencies {
    pub job_repo: Arc<dyn ArticleJobRepository>,
    pub idea_repo: Arc<dyn IdeaRepository>,
    pub article_repo: Arc<dyn ArticleRepository>,
}

pub struct MockQueue {
    deps: MockQueueDependencies,
    processing_delay: Duration,
}

const CANNED_IDEAS: &[(&str, &str)] = &[
    (
        "Five Local SEO Moves That Pay Off This Quarter",
        "A practical walkthrough of the highest-impact local search tactics, from review velocity to service-area pages, ordered by effort versus payoff.",
    ),
    (
        "What Your Competitors' Content Calendars Reveal",
        "How to reverse-engineer publishing cadence and topic clusters from rival blogs, and turn the gaps you find into a three-month content plan.",
    ),
    (
        "Turning Customer Questions Into Evergreen Articles",
        "A repeatable process for mining support threads and sales calls for article topics that keep earning search traffic long after publication.",
    ),
    (
        "The Case for Publishing Less, But Better",
        "Why trimming a content calendar to fewer, deeper pieces often lifts organic traffic, with before-and-after numbers from real small businesses.",
    ),
    (
        "A Beginner's Map of Content That Converts",
        "Which article formats actually move readers toward a purchase, and how to sequence awareness, comparison, and decision pieces on a small budget.",
    ),
];

impl MockQueue {
    pub fn new(deps: MockQueueDependencies, processing_delay: Duration) -> Self {
        Self {
            deps,
            processing_delay,
        }
    }

    fn run_envelope(&self, envelope: JobEnvelope) {
        let deps = self.deps.clone();
        let delay = self.processing_delay;
        tokio::spawn(async move {
            let result = match envelope {
                JobEnvelope::GenerateIdeas(msg) => {
                    run_generate_ideas(&deps, delay, msg.job_id, msg.user_id, msg.count).await
                }
                JobEnvelope::Publish(msg) => run_publish(&deps, delay, msg.article_id).await,
            };
            if let Err(e) = result {
                error!("mock queue job failed: {e}");
            }
        });
    }
}

async fn run_generate_ideas(
    deps: &MockQueueDependencies,
    delay: Duration,
    job_id: Uuid,
    user_id: Uuid,
    count: usize,
) -> eyre::Result<()> {
    let step = delay / 3;
    for progress in [10, 30, 60] {
        if let Some(mut job) = deps.job_repo.find_by_id(job_id).await? {
            job.set_processing(progress);
            deps.job_repo.update(job).await?;
        }
        tokio::time::sleep(step).await;
    }

    let count = count.clamp(1, CANNED_IDEAS.len());
    let ideas = CANNED_IDEAS
        .iter()
        .take(count)
        .map(|(title, summary)| {
            ArticleIdea::new(user_id, job_id, *title, *summary)
        })
        .collect::<Vec<_>>();
    deps.idea_repo.create_batch(ideas).await?;

    if let Some(mut job) = deps.job_repo.find_by_id(job_id).await? {
        job.set_completed();
        deps.job_repo.update(job).await?;
    }
    info!("mock queue completed idea generation for job {job_id}");
    Ok(())
}

async fn run_publish(
    deps: &MockQueueDependencies,
    delay: Duration,
    article_id: Uuid,
) -> eyre::Result<()> {
    let Some(mut article) = deps.article_repo.find_by_id(article_id).await? else {
        warn!("mock queue got a publish job for unknown article {article_id}");
        return Ok(());
    };

    article.set_publishing();
    let article = deps.article_repo.update(article).await?;
    tokio::time::sleep(delay).await;

    let mut article = deps
        .article_repo
        .find_by_id(article.id)
        .await?
        .unwrap_or(article);
    if article.content.is_none() {
        article.content = Some(format!(
            "<h1>{}</h1><p>Draft produced by the local development queue.</p>",
            article.title
        ));
    }
    let url = format!("https://example.com/posts/{}", slugify(&article.title));
    article.set_published(url);
    deps.article_repo.update(article).await?;
    info!("mock queue published article {article_id}");
    Ok(())
}

#[async_trait]
impl QueueService for MockQueue {
    async fn send(&self, queue_name: &str, body: Vec<u8>) -> Result<(), QueueError> {
        let envelope: JobEnvelope = serde_json::from_slice(&body).map_err(|e| {
            QueueError::InvalidInput(format!("mock queue could not decode job: {e}"))
        })?;
        info!("mock queue executing job sent to {queue_name} inline");
        self.run_envelope(envelope);
        Ok(())
    }

    async fn send_batch(&self, queue_name: &str, bodies: Vec<Vec<u8>>) -> Result<(), QueueError> {
        for body in bodies {
            self.send(queue_name, body).await?;
        }
        Ok(())
    }

    async fn receive(
        &self,
        _queue_name: &str,
        _max_messages: usize,
    ) -> Result<Vec<Message>, QueueError> {
        // Jobs run inline at send time; there is never anything to poll.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleJob, JobPayload, JobType};
    use crate::repositories::{InMemoryArticleRepository, InMemoryIdeaRepository, InMemoryJobRepository};

    fn deps() -> MockQueueDependencies {
        MockQueueDependencies {
            job_repo: Arc::new(InMemoryJobRepository::new()),
            idea_repo: Arc::new(InMemoryIdeaRepository::new()),
            article_repo: Arc::new(InMemoryArticleRepository::new()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn generate_ideas_job_completes_with_canned_ideas() {
        let deps = deps();
        let job = ArticleJob::new(
            Uuid::new_v4(),
            JobType::GenerateIdeas,
            JobPayload::default(),
        );
        let job_id = job.id;
        deps.job_repo.create(job).await.unwrap();

        let queue = MockQueue::new(deps.clone(), Duration::from_secs(3));
        let body = serde_json::to_vec(&serde_json::json!({
            "type": "generate_ideas",
            "jobID": job_id,
            "userID": Uuid::new_v4(),
            "count": 3,
        }))
        .unwrap();
        queue.send("idea-jobs", body).await.unwrap();

        // Paused-clock sleeps advance instantly once the runtime idles.
        tokio::time::sleep(Duration::from_secs(5)).await;

        let job = deps.job_repo.find_by_id(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        let ideas = deps.idea_repo.list_by_job(job_id).await.unwrap();
        assert_eq!(ideas.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_job_publishes_under_a_slugged_url() {
        let deps = deps();
        let article = deps
            .article_repo
            .create(crate::models::Article::new(
                Uuid::new_v4(),
                None,
                "Winter Tune-Up Checklist",
            ))
            .await
            .unwrap();

        let queue = MockQueue::new(deps.clone(), Duration::from_secs(2));
        let body = serde_json::to_vec(&serde_json::json!({
            "type": "publish",
            "articleId": article.id,
            "userID": article.user_id,
        }))
        .unwrap();
        queue.send("publish-jobs", body).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;

        let stored = deps
            .article_repo
            .find_by_id(article.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, crate::models::ArticleStatus::Published);
        assert_eq!(
            stored.post_url.as_deref(),
            Some("https://example.com/posts/winter-tune-up-checklist")
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_rejected() {
        let queue = MockQueue::new(deps(), Duration::from_millis(1));
        let err = queue.send("idea-jobs", b"not json".to_vec()).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidInput(_)));
    }
}
