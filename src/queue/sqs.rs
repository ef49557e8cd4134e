//! AWS SQS backend for the queue abstraction.
//!
//! Works against both real SQS and LocalStack; the only difference is the
//! endpoint override and static credentials in [`QueueConfig`].

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_sqs::types::{MessageSystemAttributeName, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::RwLock;

use crate::config::QueueConfig;

use super::{BatchEntryFailure, Message, QueueError, QueueService, MAX_BATCH_SIZE};

/// Long-poll wait applied to every receive call, in seconds.
const WAIT_TIME_SECONDS: i32 = 20;

#[derive(Debug)]
pub struct SqsQueue {
    client: Client,
    /// queue name -> queue URL cache
    queue_urls: RwLock<HashMap<String, String>>,
    visibility_timeout: i32,
}

impl SqsQueue {
    pub fn new(client: Client, visibility_timeout_secs: i32) -> Self {
        Self {
            client,
            queue_urls: RwLock::new(HashMap::new()),
            visibility_timeout: if visibility_timeout_secs > 0 {
                visibility_timeout_secs
            } else {
                30
            },
        }
    }

    /// Builds an SQS client from the queue configuration.
    pub async fn connect(config: &QueueConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::from_keys(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                None,
            ));

        if let Some(endpoint) = &config.endpoint {
            debug!("using custom SQS endpoint {endpoint}");
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);
        info!(
            "SQS client created (region {}, endpoint {})",
            config.region,
            config.endpoint.as_deref().unwrap_or("default")
        );

        Self::new(client, config.visibility_timeout_secs)
    }

    async fn queue_url(&self, queue_name: &str) -> Result<String, QueueError> {
        if queue_name.is_empty() {
            return Err(QueueError::InvalidInput(
                "queue name must not be empty".into(),
            ));
        }

        if let Some(url) = self.queue_urls.read().await.get(queue_name) {
            return Ok(url.clone());
        }

        let out = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| QueueError::Unhealthy {
                queue: queue_name.to_string(),
                reason: e.to_string(),
            })?;

        let url = out.queue_url().unwrap_or_default().to_string();
        if url.is_empty() {
            return Err(QueueError::Unhealthy {
                queue: queue_name.to_string(),
                reason: "broker returned an empty queue URL".into(),
            });
        }

        self.queue_urls
            .write()
            .await
            .insert(queue_name.to_string(), url.clone());
        debug!("cached queue URL for {queue_name}: {url}");
        Ok(url)
    }
}

#[async_trait]
impl QueueService for SqsQueue {
    async fn send(&self, queue_name: &str, body: Vec<u8>) -> Result<(), QueueError> {
        if body.is_empty() {
            return Err(QueueError::InvalidInput(
                "message body must not be empty".into(),
            ));
        }
        let url = self.queue_url(queue_name).await?;
        let body = String::from_utf8(body)
            .map_err(|e| QueueError::InvalidInput(format!("message body is not UTF-8: {e}")))?;

        let out = self
            .client
            .send_message()
            .queue_url(url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::SendFailed {
                queue: queue_name.to_string(),
                reason: e.to_string(),
            })?;

        debug!(
            "sent message {} to queue {queue_name}",
            out.message_id().unwrap_or("<unknown>")
        );
        Ok(())
    }

    async fn send_batch(&self, queue_name: &str, bodies: Vec<Vec<u8>>) -> Result<(), QueueError> {
        if bodies.is_empty() {
            return Err(QueueError::InvalidInput("batch must not be empty".into()));
        }
        if bodies.len() > MAX_BATCH_SIZE {
            return Err(QueueError::InvalidInput(format!(
                "batch size {} exceeds the limit of {MAX_BATCH_SIZE}",
                bodies.len()
            )));
        }
        let url = self.queue_url(queue_name).await?;
        let total = bodies.len();

        let mut entries = Vec::with_capacity(total);
        for (i, body) in bodies.into_iter().enumerate() {
            let body = String::from_utf8(body).map_err(|e| {
                QueueError::InvalidInput(format!("batch entry {i} is not UTF-8: {e}"))
            })?;
            let entry = SendMessageBatchRequestEntry::builder()
                .id(i.to_string())
                .message_body(body)
                .build()
                .map_err(|e| QueueError::InvalidInput(e.to_string()))?;
            entries.push(entry);
        }

        let out = self
            .client
            .send_message_batch()
            .queue_url(url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| QueueError::SendFailed {
                queue: queue_name.to_string(),
                reason: e.to_string(),
            })?;

        let failed = out.failed();
        if !failed.is_empty() {
            let failures = failed
                .iter()
                .map(|entry| BatchEntryFailure {
                    index: entry.id().parse().unwrap_or_default(),
                    code: entry.code().to_string(),
                    message: entry.message().unwrap_or_default().to_string(),
                })
                .collect();
            return Err(QueueError::BatchPartialFailure {
                queue: queue_name.to_string(),
                total,
                failures,
            });
        }

        debug!("sent batch of {total} messages to queue {queue_name}");
        Ok(())
    }

    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
    ) -> Result<Vec<Message>, QueueError> {
        let max_messages = max_messages.clamp(1, MAX_BATCH_SIZE) as i32;
        let url = self.queue_url(queue_name).await?;

        let out = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(max_messages)
            .visibility_timeout(self.visibility_timeout)
            .wait_time_seconds(WAIT_TIME_SECONDS)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(|e| QueueError::ReceiveFailed {
                queue: queue_name.to_string(),
                reason: e.to_string(),
            })?;

        let messages = out
            .messages()
            .iter()
            .map(|m| {
                let attributes = m.attributes();
                let receive_count = attributes
                    .and_then(|a| a.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                let first_received = attributes
                    .and_then(|a| a.get(&MessageSystemAttributeName::SentTimestamp))
                    .and_then(|v| v.parse::<i64>().ok())
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .unwrap_or_else(Utc::now);

                Message {
                    id: m.message_id().unwrap_or_default().to_string(),
                    body: m.body().unwrap_or_default().as_bytes().to_vec(),
                    receipt_handle: m.receipt_handle().unwrap_or_default().to_string(),
                    receive_count,
                    first_received,
                }
            })
            .collect::<Vec<_>>();

        if !messages.is_empty() {
            debug!("received {} messages from queue {queue_name}", messages.len());
        }
        Ok(messages)
    }

    async fn delete(&self, queue_name: &str, receipt_handle: &str) -> Result<(), QueueError> {
        if receipt_handle.is_empty() {
            return Err(QueueError::InvalidInput(
                "receipt handle must not be empty".into(),
            ));
        }
        let url = self.queue_url(queue_name).await?;

        let result = self
            .client
            .delete_message()
            .queue_url(url)
            .receipt_handle(receipt_handle)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                // An expired or already-consumed handle means the message is
                // gone either way; deletion stays idempotent.
                if service_err.is_receipt_handle_is_invalid() {
                    warn!("delete on queue {queue_name} hit an expired receipt handle");
                    return Ok(());
                }
                Err(QueueError::DeleteFailed {
                    queue: queue_name.to_string(),
                    reason: service_err.to_string(),
                })
            }
        }
    }

    async fn extend_lease(
        &self,
        queue_name: &str,
        receipt_handle: &str,
        seconds: u32,
    ) -> Result<(), QueueError> {
        if seconds > super::MAX_LEASE_EXTENSION_SECS {
            return Err(QueueError::InvalidInput(format!(
                "lease extension of {seconds}s exceeds the limit of {}s",
                super::MAX_LEASE_EXTENSION_SECS
            )));
        }
        let url = self.queue_url(queue_name).await?;

        self.client
            .change_message_visibility()
            .queue_url(url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(seconds as i32)
            .send()
            .await
            .map_err(|e| QueueError::LeaseExtensionFailed {
                queue: queue_name.to_string(),
                reason: e.to_string(),
            })?;

        debug!("extended lease on queue {queue_name} by {seconds}s");
        Ok(())
    }

    async fn health_check(&self, queue_name: &str) -> Result<(), QueueError> {
        self.queue_url(queue_name).await.map(|_| ())
    }
}
