//! Content agent client.
//!
//! The agent is an OpenAI-compatible chat completion endpoint. Requests
//! carry the business context assembled by the workers; responses are asked
//! for as strict JSON so they can be decoded without scraping.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::config::AgentConfig;
use crate::constants::AGENT_REQUEST_TIMEOUT;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("agent returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("agent response carried no content")]
    EmptyResponse,
    #[error("agent response was not the expected JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Context handed to the agent when generating ideas.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdeaGenerationRequest {
    pub business_description: String,
    pub competitors: Vec<String>,
    pub count: usize,
    pub objectives: Option<String>,
    pub location: Option<String>,
}

/// Context handed to the agent when drafting a full article.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArticleDraftRequest {
    pub title: String,
    pub summary: String,
    pub feedback: Option<String>,
    pub business_description: String,
    pub objectives: Option<String>,
    pub location: Option<String>,
    pub brand_tone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedIdea {
    pub title: String,
    pub summary: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn generate_ideas(
        &self,
        request: IdeaGenerationRequest,
    ) -> Result<Vec<GeneratedIdea>, AgentError>;

    /// Returns the drafted article body as Markdown.
    async fn generate_article(&self, request: ArticleDraftRequest) -> Result<String, AgentError>;
}

#[derive(Debug, Clone)]
pub struct HttpAgentService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl HttpAgentService {
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(AGENT_REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn chat(&self, system: &str, user: String) -> Result<String, AgentError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AgentError::EmptyResponse)
    }
}

const IDEAS_SYSTEM_PROMPT: &str = "You are a content strategist for small businesses. \
Respond only with a JSON array of objects, each with a \"title\" and a \"summary\" field. \
Summaries are two or three sentences.";

const ARTICLE_SYSTEM_PROMPT: &str = "You are a professional content writer. \
Write the full article in Markdown. Respond with the article body only, no preamble.";

#[async_trait]
impl AgentService for HttpAgentService {
    async fn generate_ideas(
        &self,
        request: IdeaGenerationRequest,
    ) -> Result<Vec<GeneratedIdea>, AgentError> {
        let mut prompt = format!(
            "Suggest {} blog article ideas for the following business.\n\nBusiness: {}",
            request.count, request.business_description
        );
        if !request.competitors.is_empty() {
            prompt.push_str(&format!(
                "\nCompetitors: {}",
                request.competitors.join(", ")
            ));
        }
        if let Some(objectives) = &request.objectives {
            prompt.push_str(&format!("\nMarketing objectives: {objectives}"));
        }
        if let Some(location) = &request.location {
            prompt.push_str(&format!("\nLocation: {location}"));
        }

        let content = self.chat(IDEAS_SYSTEM_PROMPT, prompt).await?;
        debug!("agent returned {} bytes of idea JSON", content.len());
        let ideas: Vec<GeneratedIdea> = serde_json::from_str(content.trim())?;
        Ok(ideas)
    }

    async fn generate_article(&self, request: ArticleDraftRequest) -> Result<String, AgentError> {
        let mut prompt = format!(
            "Write a blog article titled \"{}\".\n\nSummary of the angle: {}\n\nBusiness: {}",
            request.title, request.summary, request.business_description
        );
        if let Some(feedback) = &request.feedback {
            prompt.push_str(&format!("\nReader feedback to incorporate: {feedback}"));
        }
        if let Some(objectives) = &request.objectives {
            prompt.push_str(&format!("\nMarketing objectives: {objectives}"));
        }
        if let Some(location) = &request.location {
            prompt.push_str(&format!("\nLocation: {location}"));
        }
        if let Some(tone) = &request.brand_tone {
            prompt.push_str(&format!("\nTone: {tone}"));
        }

        self.chat(ARTICLE_SYSTEM_PROMPT, prompt).await
    }
}
