//! WordPress publishing client.
//!
//! Posts are created through the WordPress REST API using an application
//! password. Credentials arrive decrypted from the publisher worker and are
//! never stored by this module.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("CMS request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("CMS rejected the credentials for {site}")]
    Unauthorized { site: String },
    #[error("CMS returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("CMS response carried no post link")]
    MissingLink,
}

/// Decrypted WordPress credentials, valid only for the duration of one
/// publish call.
#[derive(Debug, Clone)]
pub struct WordPressCredentials {
    pub site_url: String,
    pub username: String,
    pub app_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    /// Rendered HTML body.
    pub content: String,
    pub status: String,
}

impl NewPost {
    pub fn publish(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            status: "publish".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    pub link: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CmsService: Send + Sync {
    async fn create_post(
        &self,
        credentials: &WordPressCredentials,
        post: &NewPost,
    ) -> Result<PublishedPost, CmsError>;
}

#[derive(Debug, Clone)]
pub struct WordPressClient {
    client: Client,
}

impl WordPressClient {
    pub fn new() -> Result<Self, CmsError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CmsService for WordPressClient {
    async fn create_post(
        &self,
        credentials: &WordPressCredentials,
        post: &NewPost,
    ) -> Result<PublishedPost, CmsError> {
        let url = format!(
            "{}/wp-json/wp/v2/posts",
            credentials.site_url.trim_end_matches('/')
        );
        debug!("publishing post '{}' to {url}", post.title);

        let response = self
            .client
            .post(url)
            .basic_auth(&credentials.username, Some(&credentials.app_password))
            .json(post)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CmsError::Unauthorized {
                site: credentials.site_url.clone(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let published: PublishedPost = response.json().await?;
        if published.link.is_empty() {
            return Err(CmsError::MissingLink);
        }
        Ok(published)
    }
}
