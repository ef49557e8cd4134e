//! Article job storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::models::{ArticleJob, RepositoryError};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArticleJobRepository: Send + Sync {
    async fn create(&self, job: ArticleJob) -> Result<ArticleJob, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleJob>, RepositoryError>;

    /// Replaces the stored job. Fails with `NotFound` when the job was never
    /// created, so a worker cannot resurrect a deleted row.
    async fn update(&self, job: ArticleJob) -> Result<ArticleJob, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    store: Mutex<HashMap<Uuid, ArticleJob>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire_lock<T>(lock: &Mutex<T>) -> Result<MutexGuard<T>, RepositoryError> {
        Ok(lock.lock().await)
    }
}

#[async_trait]
impl ArticleJobRepository for InMemoryJobRepository {
    async fn create(&self, job: ArticleJob) -> Result<ArticleJob, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&job.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "job with ID '{}' already exists",
                job.id
            )));
        }
        store.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleJob>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store.get(&id).cloned())
    }

    async fn update(&self, job: ArticleJob) -> Result<ArticleJob, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if !store.contains_key(&job.id) {
            return Err(RepositoryError::NotFound(format!(
                "job with ID '{}' not found",
                job.id
            )));
        }
        store.insert(job.id, job.clone());
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPayload, JobStatus, JobType};

    fn job() -> ArticleJob {
        ArticleJob::new(Uuid::new_v4(), JobType::GenerateIdeas, JobPayload::default())
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let repo = InMemoryJobRepository::new();
        let created = repo.create(job()).await.unwrap();
        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn duplicate_create_is_a_constraint_violation() {
        let repo = InMemoryJobRepository::new();
        let created = repo.create(job()).await.unwrap();
        let err = repo.create(created).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn update_of_unknown_job_fails() {
        let repo = InMemoryJobRepository::new();
        let err = repo.update(job()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_job_is_none_not_an_error() {
        let repo = InMemoryJobRepository::new();
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
