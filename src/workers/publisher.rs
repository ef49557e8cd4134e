//! Publishing handler.
//!
//! Drives one `publish` job: moves the article to `publishing`, drafts the
//! body with the agent unless a retry can reuse the stored draft, renders
//! it to HTML, and pushes it to the user's WordPress site with credentials
//! decrypted on the spot.

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};

use crate::jobs::{JobEnvelope, PublishMessage};
use crate::models::{Article, ArticleStatus, IntegrationType, RepositoryError};
use crate::repositories::{ArticleRepository, BusinessProfileRepository, IntegrationRepository};
use crate::services::{
    AgentService, ArticleDraftRequest, CmsService, NewPost, WordPressCredentials,
};
use crate::utils::{markdown_to_html, FieldEncryption};

use super::{HandlerError, JobHandler};

#[derive(Clone)]
pub struct PublishHandler {
    queue_name: String,
    article_repo: Arc<dyn ArticleRepository>,
    business_repo: Arc<dyn BusinessProfileRepository>,
    integration_repo: Arc<dyn IntegrationRepository>,
    agent: Arc<dyn AgentService>,
    cms: Arc<dyn CmsService>,
    encryption: FieldEncryption,
}

impl PublishHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue_name: impl Into<String>,
        article_repo: Arc<dyn ArticleRepository>,
        business_repo: Arc<dyn BusinessProfileRepository>,
        integration_repo: Arc<dyn IntegrationRepository>,
        agent: Arc<dyn AgentService>,
        cms: Arc<dyn CmsService>,
        encryption: FieldEncryption,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            article_repo,
            business_repo,
            integration_repo,
            agent,
            cms,
            encryption,
        }
    }

    /// Returns the article body, drafting one through the agent unless a
    /// retry can reuse the draft stored by the failed attempt.
    async fn article_content(
        &self,
        article: &mut Article,
        message: &PublishMessage,
    ) -> Result<String, HandlerError> {
        if message.is_retry {
            if let Some(content) = &article.content {
                info!("reusing stored draft for article {}", article.id);
                return Ok(content.clone());
            }
        }

        let profile = self
            .business_repo
            .find_by_user(message.user_id)
            .await
            .map_err(repo_failure)?;

        let request = match &profile {
            Some(profile) => ArticleDraftRequest {
                title: article.title.clone(),
                summary: message.summary.clone(),
                feedback: message.feedback.clone(),
                business_description: profile.description.clone(),
                objectives: Some(profile.objectives()),
                location: Some(profile.location()),
                brand_tone: profile.brand_tone(),
            },
            None => ArticleDraftRequest {
                title: article.title.clone(),
                summary: message.summary.clone(),
                feedback: message.feedback.clone(),
                ..Default::default()
            },
        };

        let content = self
            .agent
            .generate_article(request)
            .await
            .map_err(|e| HandlerError::Failed(format!("agent call failed: {e}")))?;

        // Persist the draft before publishing so a CMS failure does not
        // force a second agent call on retry.
        article.content = Some(content.clone());
        *article = self
            .article_repo
            .update(article.clone())
            .await
            .map_err(repo_failure)?;
        Ok(content)
    }

    async fn credentials(
        &self,
        message: &PublishMessage,
    ) -> Result<WordPressCredentials, HandlerError> {
        let integration = self
            .integration_repo
            .find_enabled(message.user_id, IntegrationType::WordPress)
            .await
            .map_err(repo_failure)?
            .ok_or_else(|| {
                HandlerError::Failed(format!(
                    "user {} has no enabled WordPress integration",
                    message.user_id
                ))
            })?;
        let config = integration
            .wordpress_config()
            .map_err(|e| HandlerError::Failed(e.to_string()))?;
        let app_password = self
            .encryption
            .decrypt_string(&config.app_password)
            .map_err(|e| HandlerError::Failed(format!("credential decryption failed: {e}")))?;
        Ok(WordPressCredentials {
            site_url: config.site_url.clone(),
            username: config.username.clone(),
            app_password,
        })
    }
}

fn repo_failure(e: RepositoryError) -> HandlerError {
    HandlerError::Failed(e.to_string())
}

#[async_trait]
impl JobHandler for PublishHandler {
    type Message = PublishMessage;

    fn queue_name(&self) -> &str {
        &self.queue_name
    }

    fn accept(&self, envelope: JobEnvelope) -> Option<Self::Message> {
        match envelope {
            JobEnvelope::Publish(message) => Some(message),
            _ => None,
        }
    }

    async fn handle(&self, message: &Self::Message, attempt: u32) -> Result<(), HandlerError> {
        let mut article = self
            .article_repo
            .find_by_id(message.article_id)
            .await
            .map_err(repo_failure)?
            .ok_or_else(|| {
                HandlerError::MissingRecord(format!("article {}", message.article_id))
            })?;

        if article.status == ArticleStatus::Published {
            info!("article {} already published, skipping", article.id);
            return Ok(());
        }

        if attempt > 0 {
            info!("retrying publish of article {} (attempt {attempt})", article.id);
        }

        article.set_publishing();
        let mut article = self
            .article_repo
            .update(article)
            .await
            .map_err(repo_failure)?;

        let content = self.article_content(&mut article, message).await?;
        let credentials = self.credentials(message).await?;

        let post = NewPost::publish(article.title.clone(), markdown_to_html(&content));
        let published = self
            .cms
            .create_post(&credentials, &post)
            .await
            .map_err(|e| HandlerError::Failed(format!("CMS call failed: {e}")))?;

        article.set_published(published.link.clone());
        self.article_repo
            .update(article)
            .await
            .map_err(repo_failure)?;
        info!(
            "article {} published at {}",
            message.article_id, published.link
        );
        Ok(())
    }

    async fn mark_failed(&self, message: &Self::Message, reason: &str) {
        match self.article_repo.find_by_id(message.article_id).await {
            Ok(Some(mut article)) => {
                article.set_error(reason);
                if let Err(e) = self.article_repo.update(article).await {
                    error!(
                        "could not mark article {} as errored: {e}",
                        message.article_id
                    );
                }
            }
            Ok(None) => {}
            Err(e) => error!(
                "could not load article {} to mark it errored: {e}",
                message.article_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessProfile, Integration, WordPressConfig};
    use crate::repositories::{
        InMemoryArticleRepository, InMemoryBusinessProfileRepository, InMemoryIntegrationRepository,
    };
    use crate::services::{CmsError, MockAgentService, MockCmsService, PublishedPost};
    use chrono::Utc;
    use uuid::Uuid;

    struct Fixture {
        article_repo: Arc<InMemoryArticleRepository>,
        business_repo: Arc<InMemoryBusinessProfileRepository>,
        integration_repo: Arc<InMemoryIntegrationRepository>,
        encryption: FieldEncryption,
        user_id: Uuid,
    }

    impl Fixture {
        async fn new() -> Self {
            let fixture = Self {
                article_repo: Arc::new(InMemoryArticleRepository::new()),
                business_repo: Arc::new(InMemoryBusinessProfileRepository::new()),
                integration_repo: Arc::new(InMemoryIntegrationRepository::new()),
                encryption: FieldEncryption::new_with_key(&[7u8; 32]),
                user_id: Uuid::new_v4(),
            };

            fixture
                .business_repo
                .create(BusinessProfile {
                    id: Uuid::new_v4(),
                    user_id: fixture.user_id,
                    description: "Neighborhood yoga studio".into(),
                    primary_objective: "fill morning classes".into(),
                    secondary_objective: None,
                    city: "Boise".into(),
                    state: "ID".into(),
                    country: "USA".into(),
                    brand_file_url: None,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();

            let encrypted = fixture
                .encryption
                .encrypt_string("wp-app-password")
                .unwrap();
            fixture
                .integration_repo
                .create(Integration::wordpress(
                    fixture.user_id,
                    WordPressConfig {
                        site_url: "https://blog.example.com".into(),
                        username: "editor".into(),
                        app_password: encrypted,
                    },
                ))
                .await
                .unwrap();

            fixture
        }

        async fn seed_article(&self) -> Article {
            self.article_repo
                .create(Article::new(self.user_id, None, "Morning Flow Basics"))
                .await
                .unwrap()
        }

        fn handler(
            &self,
            agent: MockAgentService,
            cms: MockCmsService,
        ) -> PublishHandler {
            PublishHandler::new(
                "publish-jobs",
                self.article_repo.clone(),
                self.business_repo.clone(),
                self.integration_repo.clone(),
                Arc::new(agent),
                Arc::new(cms),
                self.encryption.clone(),
            )
        }

        fn message(&self, article: &Article, is_retry: bool) -> PublishMessage {
            PublishMessage {
                article_id: article.id,
                user_id: self.user_id,
                summary: "Why mornings are the best time to practice".into(),
                feedback: None,
                is_retry,
            }
        }
    }

    fn agent_drafting(markdown: &'static str) -> MockAgentService {
        let mut agent = MockAgentService::new();
        agent
            .expect_generate_article()
            .returning(move |_| Ok(markdown.to_string()));
        agent
    }

    fn cms_accepting() -> MockCmsService {
        let mut cms = MockCmsService::new();
        cms.expect_create_post()
            .withf(|credentials, post| {
                credentials.app_password == "wp-app-password"
                    && post.content.contains("<h1>Morning Flow</h1>")
            })
            .returning(|_, _| {
                Ok(PublishedPost {
                    id: 42,
                    link: "https://blog.example.com/morning-flow".into(),
                })
            });
        cms
    }

    #[tokio::test]
    async fn happy_path_publishes_and_stores_the_link() {
        let fixture = Fixture::new().await;
        let article = fixture.seed_article().await;
        let handler = fixture.handler(agent_drafting("# Morning Flow\n\nBreathe."), cms_accepting());

        handler.handle(&fixture.message(&article, false), 0).await.unwrap();

        let stored = fixture
            .article_repo
            .find_by_id(article.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ArticleStatus::Published);
        assert_eq!(
            stored.post_url.as_deref(),
            Some("https://blog.example.com/morning-flow")
        );
        assert!(stored.content.is_some());
    }

    #[tokio::test]
    async fn retry_reuses_stored_draft_without_an_agent_call() {
        let fixture = Fixture::new().await;
        let mut article = fixture.seed_article().await;
        article.content = Some("# Morning Flow\n\nStored draft.".into());
        article.set_error("cms outage");
        fixture.article_repo.update(article.clone()).await.unwrap();

        // No generate_article expectation: an agent call would panic.
        let handler = fixture.handler(MockAgentService::new(), cms_accepting());
        handler.handle(&fixture.message(&article, true), 0).await.unwrap();

        let stored = fixture
            .article_repo
            .find_by_id(article.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ArticleStatus::Published);
    }

    #[tokio::test]
    async fn already_published_article_is_skipped() {
        let fixture = Fixture::new().await;
        let mut article = fixture.seed_article().await;
        article.set_published("https://blog.example.com/done");
        fixture.article_repo.update(article.clone()).await.unwrap();

        let handler = fixture.handler(MockAgentService::new(), MockCmsService::new());
        handler.handle(&fixture.message(&article, false), 0).await.unwrap();
    }

    #[tokio::test]
    async fn missing_article_is_a_missing_record() {
        let fixture = Fixture::new().await;
        let handler = fixture.handler(MockAgentService::new(), MockCmsService::new());
        let message = PublishMessage {
            article_id: Uuid::new_v4(),
            user_id: fixture.user_id,
            summary: String::new(),
            feedback: None,
            is_retry: false,
        };
        let err = handler.handle(&message, 0).await.unwrap_err();
        assert!(matches!(err, HandlerError::MissingRecord(_)));
    }

    #[tokio::test]
    async fn cms_failure_is_retryable_and_keeps_the_draft() {
        let fixture = Fixture::new().await;
        let article = fixture.seed_article().await;

        let mut cms = MockCmsService::new();
        cms.expect_create_post().returning(|_, _| {
            Err(CmsError::Api {
                status: 500,
                body: "server error".into(),
            })
        });
        let handler = fixture.handler(agent_drafting("# Morning Flow\n\nBreathe."), cms);

        let err = handler
            .handle(&fixture.message(&article, false), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));

        // The draft survived, so the retry attempt can skip the agent.
        let stored = fixture
            .article_repo
            .find_by_id(article.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.content.is_some());
        assert_eq!(stored.status, ArticleStatus::Publishing);
    }

    #[tokio::test]
    async fn missing_integration_fails_the_attempt() {
        let fixture = Fixture::new().await;
        let article = fixture.seed_article().await;
        let other_user = PublishMessage {
            article_id: article.id,
            user_id: Uuid::new_v4(),
            summary: String::new(),
            feedback: None,
            is_retry: false,
        };

        let handler = fixture.handler(agent_drafting("draft"), MockCmsService::new());
        let err = handler.handle(&other_user, 0).await.unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
    }

    #[tokio::test]
    async fn mark_failed_sets_error_status() {
        let fixture = Fixture::new().await;
        let article = fixture.seed_article().await;
        let handler = fixture.handler(MockAgentService::new(), MockCmsService::new());

        handler
            .mark_failed(&fixture.message(&article, false), "CMS call failed")
            .await;

        let stored = fixture
            .article_repo
            .find_by_id(article.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ArticleStatus::Error);
        assert_eq!(stored.error_message.as_deref(), Some("CMS call failed"));
    }
}
