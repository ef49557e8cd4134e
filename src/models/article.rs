//! Article entity and publishing state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArticleStatus {
    Generating,
    Publishing,
    Published,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub user_id: Uuid,
    pub idea_id: Option<Uuid>,
    pub title: String,
    pub content: Option<String>,
    pub status: ArticleStatus,
    pub post_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(user_id: Uuid, idea_id: Option<Uuid>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            idea_id,
            title: title.into(),
            content: None,
            status: ArticleStatus::Generating,
            post_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_publishing(&mut self) {
        self.status = ArticleStatus::Publishing;
        self.updated_at = Utc::now();
    }

    pub fn set_published(&mut self, post_url: impl Into<String>) {
        self.status = ArticleStatus::Published;
        self.post_url = Some(post_url.into());
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = ArticleStatus::Error;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }

    /// A failed article may be re-queued for publishing only once its
    /// content has been generated; content generation is skipped on retry.
    pub fn can_republish(&self) -> bool {
        self.status == ArticleStatus::Error && self.content.is_some()
    }
}
