//! Article job entity and its state machine.
//!
//! A job row is created by the web tier when a wizard step enqueues work and
//! is mutated afterwards only by the worker that holds the corresponding
//! queue message lease.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::constants::DEFAULT_IDEA_COUNT;

/// Job families, one queue per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobType {
    GenerateIdeas,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Typed generation context captured when the job is enqueued.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub business_description: String,
    #[serde(default)]
    pub competitors: Vec<String>,
    #[serde(default = "default_idea_count")]
    pub idea_count: u8,
    #[serde(default)]
    pub objectives: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

fn default_idea_count() -> u8 {
    DEFAULT_IDEA_COUNT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    /// 0..=100; reset on re-queue, non-decreasing while processing.
    pub progress: u8,
    pub payload: JobPayload,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleJob {
    pub fn new(user_id: Uuid, job_type: JobType, payload: JobPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_type,
            status: JobStatus::Queued,
            progress: 0,
            payload,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_queued(&mut self) {
        self.status = JobStatus::Queued;
        self.progress = 0;
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    /// Moves the job to `processing`. Progress is clamped to 100 and never
    /// allowed to regress while the job is already processing.
    pub fn set_processing(&mut self, progress: u8) {
        let progress = progress.min(100);
        self.progress = if self.status == JobStatus::Processing {
            self.progress.max(progress)
        } else {
            progress
        };
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    pub fn set_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    pub fn set_failed(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_job() -> ArticleJob {
        ArticleJob::new(
            Uuid::new_v4(),
            JobType::GenerateIdeas,
            JobPayload {
                business_description: "Local bakery with online ordering".into(),
                idea_count: 5,
                ..Default::default()
            },
        )
    }

    #[test]
    fn new_job_starts_queued_at_zero() {
        let job = queued_job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn progress_never_decreases_while_processing() {
        let mut job = queued_job();
        job.set_processing(30);
        job.set_processing(10);
        assert_eq!(job.progress, 30);
        job.set_processing(60);
        assert_eq!(job.progress, 60);
    }

    #[test]
    fn progress_is_clamped_to_100() {
        let mut job = queued_job();
        job.set_processing(250);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn requeue_resets_progress_and_error() {
        let mut job = queued_job();
        job.set_processing(80);
        job.set_failed("agent unavailable");
        job.set_queued();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn completed_forces_progress_100() {
        let mut job = queued_job();
        job.set_processing(60);
        job.set_completed();
        assert_eq!(job.progress, 100);
        assert!(job.is_terminal());
    }

    #[test]
    fn payload_defaults_idea_count() {
        let payload: JobPayload =
            serde_json::from_str(r#"{"businessDescription":"b2b consultancy"}"#).unwrap();
        assert_eq!(payload.idea_count, DEFAULT_IDEA_COUNT);
        assert!(payload.competitors.is_empty());
    }
}
