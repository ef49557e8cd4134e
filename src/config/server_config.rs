/// Configuration for the application, including queue, agent, and worker settings.
use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use strum::Display;

use crate::constants::{
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WORKER_COUNT, WORKER_DEFAULT_MAXIMUM_RETRIES,
};

/// Which queue implementation to run against. Chosen explicitly by
/// configuration; an unrecognized value falls back to `Noop` with a warning
/// rather than silently probing brokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum QueueBackend {
    Sqs,
    Mock,
    Noop,
}

impl FromStr for QueueBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "sqs" => Ok(Self::Sqs),
            "mock" => Ok(Self::Mock),
            "noop" => Ok(Self::Noop),
            other => Err(format!("unknown queue backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    /// AWS region for the SQS backend.
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Endpoint override, set when running against LocalStack.
    pub endpoint: Option<String>,
    /// Name of the idea-generation job queue.
    pub idea_queue: String,
    /// Name of the publishing job queue.
    pub publish_queue: String,
    /// Initial lease granted on received messages, in seconds.
    pub visibility_timeout_secs: i32,
    /// Simulated processing time used by the mock backend.
    pub mock_processing_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the OpenAI-compatible content agent.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub queue: QueueConfig,
    pub agent: AgentConfig,
    /// Workers spawned per queue.
    pub worker_count: usize,
    /// Attempts made on a message before it is dropped as failed.
    pub max_retries: u32,
    /// How long shutdown waits for workers to drain before forcing exit.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new `ServerConfig` instance from environment variables.
    ///
    /// # Defaults
    ///
    /// - `QUEUE_BACKEND` defaults to `"noop"`.
    /// - `AWS_REGION` defaults to `"us-east-1"`.
    /// - `IDEA_QUEUE_NAME` defaults to `"idea-jobs"`.
    /// - `PUBLISH_QUEUE_NAME` defaults to `"publish-jobs"`.
    /// - `QUEUE_VISIBILITY_TIMEOUT` defaults to `30` seconds.
    /// - `MOCK_PROCESSING_DELAY_SECS` defaults to `10` seconds.
    /// - `AGENT_BASE_URL` defaults to `"https://api.openai.com"`.
    /// - `AGENT_MODEL` defaults to `"gpt-4o-mini"`.
    /// - `WORKER_COUNT` defaults to `2` and `WORKER_MAX_RETRIES` to `3`.
    /// - `WORKER_SHUTDOWN_TIMEOUT` defaults to `30` seconds.
    pub fn from_env() -> Self {
        let backend = env::var("QUEUE_BACKEND")
            .unwrap_or_else(|_| "noop".to_string())
            .parse()
            .unwrap_or_else(|e| {
                warn!("{e}, using the noop backend");
                QueueBackend::Noop
            });

        Self {
            queue: QueueConfig {
                backend,
                region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
                endpoint: env::var("AWS_ENDPOINT_URL").ok(),
                idea_queue: env::var("IDEA_QUEUE_NAME")
                    .unwrap_or_else(|_| "idea-jobs".to_string()),
                publish_queue: env::var("PUBLISH_QUEUE_NAME")
                    .unwrap_or_else(|_| "publish-jobs".to_string()),
                visibility_timeout_secs: env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                mock_processing_delay: Duration::from_secs(
                    env::var("MOCK_PROCESSING_DELAY_SECS")
                        .unwrap_or_else(|_| "10".to_string())
                        .parse()
                        .unwrap_or(10),
                ),
            },
            agent: AgentConfig {
                base_url: env::var("AGENT_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com".to_string()),
                api_key: env::var("AGENT_API_KEY").unwrap_or_default(),
                model: env::var("AGENT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            },
            worker_count: env::var("WORKER_COUNT")
                .unwrap_or_default()
                .parse()
                .unwrap_or(DEFAULT_WORKER_COUNT),
            max_retries: env::var("WORKER_MAX_RETRIES")
                .unwrap_or_default()
                .parse()
                .unwrap_or(WORKER_DEFAULT_MAXIMUM_RETRIES),
            shutdown_timeout: env::var("WORKER_SHUTDOWN_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }
}
