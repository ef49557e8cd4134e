//! End-to-end worker tests against an in-memory broker with real lease
//! semantics: exclusive delivery while leased, redelivery after expiry,
//! receive counts, and idempotent deletes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use draftpress::jobs::{
    GenerateIdeasMessage, JobProducer, JobProducerTrait, PublishMessage,
};
use draftpress::models::{
    Article, ArticleJob, ArticleStatus, BusinessProfile, Integration, JobPayload, JobStatus,
    JobType, WordPressConfig,
};
use draftpress::queue::{BatchEntryFailure, Message, QueueError, QueueService, MAX_BATCH_SIZE};
use draftpress::repositories::{
    ArticleJobRepository, ArticleRepository, BusinessProfileRepository, IdeaRepository,
    InMemoryArticleRepository, InMemoryBusinessProfileRepository, InMemoryIdeaRepository,
    InMemoryIntegrationRepository, InMemoryJobRepository, IntegrationRepository,
};
use draftpress::services::{
    AgentError, AgentService, ArticleDraftRequest, CmsError, CmsService, GeneratedIdea,
    IdeaGenerationRequest, NewPost, PublishedPost, WordPressCredentials,
};
use draftpress::utils::FieldEncryption;
use draftpress::workers::{IdeaGenerationHandler, PollWorker, PublishHandler};

const VISIBILITY: Duration = Duration::from_secs(30);

struct Entry {
    id: String,
    body: Vec<u8>,
    receive_count: u32,
    receipt_handle: Option<String>,
    leased_until: Option<Instant>,
}

/// Broker double implementing the lease protocol in memory.
#[derive(Default)]
struct LeaseQueue {
    queues: Mutex<HashMap<String, Vec<Entry>>>,
}

impl LeaseQueue {
    fn new() -> Self {
        Self::default()
    }

    async fn len(&self, queue_name: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue_name)
            .map(|q| q.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl QueueService for LeaseQueue {
    async fn send(&self, queue_name: &str, body: Vec<u8>) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        queues.entry(queue_name.to_string()).or_default().push(Entry {
            id: Uuid::new_v4().to_string(),
            body,
            receive_count: 0,
            receipt_handle: None,
            leased_until: None,
        });
        Ok(())
    }

    async fn send_batch(&self, queue_name: &str, bodies: Vec<Vec<u8>>) -> Result<(), QueueError> {
        if bodies.len() > MAX_BATCH_SIZE {
            return Err(QueueError::BatchPartialFailure {
                queue: queue_name.to_string(),
                total: bodies.len(),
                failures: vec![BatchEntryFailure {
                    index: MAX_BATCH_SIZE,
                    code: "TooManyEntries".into(),
                    message: "batch exceeds the broker limit".into(),
                }],
            });
        }
        for body in bodies {
            self.send(queue_name, body).await?;
        }
        Ok(())
    }

    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
    ) -> Result<Vec<Message>, QueueError> {
        let now = Instant::now();
        let mut queues = self.queues.lock().await;
        let Some(entries) = queues.get_mut(queue_name) else {
            return Ok(Vec::new());
        };

        // Expired leases go back on the queue before anything is handed out.
        for entry in entries.iter_mut() {
            if entry.leased_until.is_some_and(|until| until <= now) {
                entry.leased_until = None;
                entry.receipt_handle = None;
            }
        }

        let mut delivered = Vec::new();
        for entry in entries.iter_mut() {
            if delivered.len() >= max_messages.clamp(1, MAX_BATCH_SIZE) {
                break;
            }
            if entry.leased_until.is_some() {
                continue;
            }
            entry.receive_count += 1;
            let receipt = Uuid::new_v4().to_string();
            entry.receipt_handle = Some(receipt.clone());
            entry.leased_until = Some(now + VISIBILITY);
            delivered.push(Message {
                id: entry.id.clone(),
                body: entry.body.clone(),
                receipt_handle: receipt,
                receive_count: entry.receive_count,
                first_received: Utc::now(),
            });
        }
        Ok(delivered)
    }

    async fn delete(&self, queue_name: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        if let Some(entries) = queues.get_mut(queue_name) {
            // Unknown handles are fine: the message is gone either way.
            entries.retain(|e| e.receipt_handle.as_deref() != Some(receipt_handle));
        }
        Ok(())
    }

    async fn extend_lease(
        &self,
        queue_name: &str,
        receipt_handle: &str,
        seconds: u32,
    ) -> Result<(), QueueError> {
        let now = Instant::now();
        let mut queues = self.queues.lock().await;
        if let Some(entries) = queues.get_mut(queue_name) {
            for entry in entries.iter_mut() {
                if entry.receipt_handle.as_deref() == Some(receipt_handle) {
                    entry.leased_until = Some(now + Duration::from_secs(seconds as u64));
                }
            }
        }
        Ok(())
    }

    async fn health_check(&self, _queue_name: &str) -> Result<(), QueueError> {
        Ok(())
    }
}

struct StubAgent {
    fail: bool,
}

#[async_trait]
impl AgentService for StubAgent {
    async fn generate_ideas(
        &self,
        request: IdeaGenerationRequest,
    ) -> Result<Vec<GeneratedIdea>, AgentError> {
        if self.fail {
            return Err(AgentError::EmptyResponse);
        }
        Ok((0..request.count)
            .map(|i| GeneratedIdea {
                title: format!("Idea {i}"),
                summary: format!("Summary for idea {i}"),
            })
            .collect())
    }

    async fn generate_article(&self, request: ArticleDraftRequest) -> Result<String, AgentError> {
        if self.fail {
            return Err(AgentError::EmptyResponse);
        }
        Ok(format!("# {}\n\nBody drawn from: {}", request.title, request.summary))
    }
}

struct StubCms;

#[async_trait]
impl CmsService for StubCms {
    async fn create_post(
        &self,
        credentials: &WordPressCredentials,
        post: &NewPost,
    ) -> Result<PublishedPost, CmsError> {
        assert_eq!(credentials.app_password, "wp-app-password");
        assert!(post.content.starts_with("<h1>"));
        Ok(PublishedPost {
            id: 7,
            link: format!("{}/posts/7", credentials.site_url),
        })
    }
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..600 {
        if condition().await {
            return;
        }
        sleep(Duration::from_millis(500)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(start_paused = true)]
async fn idea_generation_flows_from_enqueue_to_completion() {
    let queue = Arc::new(LeaseQueue::new());
    let job_repo = Arc::new(InMemoryJobRepository::new());
    let idea_repo = Arc::new(InMemoryIdeaRepository::new());

    let job = job_repo
        .create(ArticleJob::new(
            Uuid::new_v4(),
            JobType::GenerateIdeas,
            JobPayload {
                business_description: "Independent bookstore".into(),
                idea_count: 2,
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let handler = IdeaGenerationHandler::new(
        "idea-jobs",
        job_repo.clone(),
        idea_repo.clone(),
        Arc::new(StubAgent { fail: false }),
    );
    let token = CancellationToken::new();
    tokio::spawn(PollWorker::new(queue.clone(), 3).run(handler, token.clone()));

    let producer = JobProducer::new(queue.clone(), "idea-jobs", "publish-jobs");
    producer
        .produce_generate_ideas_job(GenerateIdeasMessage {
            job_id: job.id,
            user_id: job.user_id,
            count: 2,
        })
        .await
        .unwrap();

    // The job must settle and the settled message must be deleted.
    let repo = job_repo.clone();
    let job_id = job.id;
    let queue_probe = queue.clone();
    wait_until(|| {
        let repo = repo.clone();
        let queue = queue_probe.clone();
        async move {
            let completed = repo
                .find_by_id(job_id)
                .await
                .unwrap()
                .is_some_and(|j| j.status == JobStatus::Completed);
            completed && queue.len("idea-jobs").await == 0
        }
    })
    .await;

    assert_eq!(idea_repo.list_by_job(job.id).await.unwrap().len(), 2);
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn publish_flows_from_enqueue_to_published_link() {
    let queue = Arc::new(LeaseQueue::new());
    let article_repo = Arc::new(InMemoryArticleRepository::new());
    let business_repo = Arc::new(InMemoryBusinessProfileRepository::new());
    let integration_repo = Arc::new(InMemoryIntegrationRepository::new());
    let encryption = FieldEncryption::new_with_key(&[9u8; 32]);

    let user_id = Uuid::new_v4();
    business_repo
        .create(BusinessProfile {
            id: Uuid::new_v4(),
            user_id,
            description: "Bike repair shop".into(),
            primary_objective: "more service bookings".into(),
            secondary_objective: None,
            city: "Madison".into(),
            state: "WI".into(),
            country: "USA".into(),
            brand_file_url: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    integration_repo
        .create(Integration::wordpress(
            user_id,
            WordPressConfig {
                site_url: "https://blog.example.com".into(),
                username: "editor".into(),
                app_password: encryption.encrypt_string("wp-app-password").unwrap(),
            },
        ))
        .await
        .unwrap();
    let article = article_repo
        .create(Article::new(user_id, None, "Winter Tune-Up Checklist"))
        .await
        .unwrap();

    let handler = PublishHandler::new(
        "publish-jobs",
        article_repo.clone(),
        business_repo,
        integration_repo,
        Arc::new(StubAgent { fail: false }),
        Arc::new(StubCms),
        encryption,
    );
    let token = CancellationToken::new();
    tokio::spawn(PollWorker::new(queue.clone(), 3).run(handler, token.clone()));

    let producer = JobProducer::new(queue.clone(), "idea-jobs", "publish-jobs");
    producer
        .produce_publish_job(PublishMessage {
            article_id: article.id,
            user_id,
            summary: "What to check before spring".into(),
            feedback: None,
            is_retry: false,
        })
        .await
        .unwrap();

    let repo = article_repo.clone();
    let article_id = article.id;
    let queue_probe = queue.clone();
    wait_until(|| {
        let repo = repo.clone();
        let queue = queue_probe.clone();
        async move {
            let published = repo
                .find_by_id(article_id)
                .await
                .unwrap()
                .is_some_and(|a| a.status == ArticleStatus::Published);
            published && queue.len("publish-jobs").await == 0
        }
    })
    .await;

    let stored = article_repo.find_by_id(article.id).await.unwrap().unwrap();
    assert_eq!(
        stored.post_url.as_deref(),
        Some("https://blog.example.com/posts/7")
    );
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn lease_gives_exclusive_delivery_until_it_expires() {
    let queue = LeaseQueue::new();
    queue.send("jobs", b"{}".to_vec()).await.unwrap();

    let first = queue.receive("jobs", 10).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].receive_count, 1);

    // A second consumer polling while the lease is held sees nothing.
    assert!(queue.receive("jobs", 10).await.unwrap().is_empty());

    sleep(VISIBILITY + Duration::from_secs(1)).await;

    let redelivered = queue.receive("jobs", 10).await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].receive_count, 2);
    assert_ne!(redelivered[0].receipt_handle, first[0].receipt_handle);
}

#[tokio::test(start_paused = true)]
async fn extended_lease_outlives_the_default_visibility() {
    let queue = LeaseQueue::new();
    queue.send("jobs", b"{}".to_vec()).await.unwrap();

    let message = queue.receive("jobs", 1).await.unwrap().remove(0);
    queue
        .extend_lease("jobs", &message.receipt_handle, 120)
        .await
        .unwrap();

    sleep(VISIBILITY + Duration::from_secs(1)).await;
    assert!(queue.receive("jobs", 10).await.unwrap().is_empty());

    sleep(Duration::from_secs(120)).await;
    assert_eq!(queue.receive("jobs", 10).await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deleting_twice_is_harmless() {
    let queue = LeaseQueue::new();
    queue.send("jobs", b"{}".to_vec()).await.unwrap();
    let message = queue.receive("jobs", 1).await.unwrap().remove(0);

    queue.delete("jobs", &message.receipt_handle).await.unwrap();
    queue.delete("jobs", &message.receipt_handle).await.unwrap();
    assert_eq!(queue.len("jobs").await, 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_mark_the_job_failed_and_settle_the_message() {
    let queue = Arc::new(LeaseQueue::new());
    let job_repo = Arc::new(InMemoryJobRepository::new());

    let job = job_repo
        .create(ArticleJob::new(
            Uuid::new_v4(),
            JobType::GenerateIdeas,
            JobPayload {
                business_description: "Food truck".into(),
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let handler = IdeaGenerationHandler::new(
        "idea-jobs",
        job_repo.clone(),
        Arc::new(InMemoryIdeaRepository::new()),
        Arc::new(StubAgent { fail: true }),
    );
    let token = CancellationToken::new();
    tokio::spawn(PollWorker::new(queue.clone(), 3).run(handler, token.clone()));

    let producer = JobProducer::new(queue.clone(), "idea-jobs", "publish-jobs");
    producer
        .produce_generate_ideas_job(GenerateIdeasMessage {
            job_id: job.id,
            user_id: job.user_id,
            count: 5,
        })
        .await
        .unwrap();

    let repo = job_repo.clone();
    let job_id = job.id;
    let queue_probe = queue.clone();
    wait_until(|| {
        let repo = repo.clone();
        let queue = queue_probe.clone();
        async move {
            let failed = repo
                .find_by_id(job_id)
                .await
                .unwrap()
                .is_some_and(|j| j.status == JobStatus::Failed);
            failed && queue.len("idea-jobs").await == 0
        }
    })
    .await;

    let failed = job_repo.find_by_id(job.id).await.unwrap().unwrap();
    assert!(failed.error_message.is_some());
    token.cancel();
}

#[tokio::test(start_paused = true)]
async fn undecodable_message_is_dropped_without_touching_jobs() {
    let queue = Arc::new(LeaseQueue::new());
    let job_repo = Arc::new(InMemoryJobRepository::new());

    queue
        .send("idea-jobs", b"this is not an envelope".to_vec())
        .await
        .unwrap();

    let handler = IdeaGenerationHandler::new(
        "idea-jobs",
        job_repo.clone(),
        Arc::new(InMemoryIdeaRepository::new()),
        Arc::new(StubAgent { fail: false }),
    );
    let token = CancellationToken::new();
    tokio::spawn(PollWorker::new(queue.clone(), 3).run(handler, token.clone()));

    let queue_probe = queue.clone();
    wait_until(|| {
        let queue = queue_probe.clone();
        async move { queue.len("idea-jobs").await == 0 }
    })
    .await;
    token.cancel();
}
