//! Wire format for queued jobs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::DEFAULT_IDEA_COUNT;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to decode job envelope: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode job envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Idea-generation job message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateIdeasMessage {
    #[serde(rename = "jobID")]
    pub job_id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    DEFAULT_IDEA_COUNT as usize
}

/// Publishing job message. `is_retry` skips content generation and reuses
/// the article body already stored from the failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishMessage {
    #[serde(rename = "articleId")]
    pub article_id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(rename = "isRetry", default)]
    pub is_retry: bool,
}

/// Tagged union of every message the workers understand. An unknown tag or
/// a malformed body fails to decode, and the consumer drops such messages
/// without retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEnvelope {
    GenerateIdeas(GenerateIdeasMessage),
    Publish(PublishMessage),
}

impl JobEnvelope {
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(EnvelopeError::Encode)
    }

    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(body).map_err(EnvelopeError::Decode)
    }
}
