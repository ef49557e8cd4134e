//! Article idea storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::models::{ArticleIdea, RepositoryError};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdeaRepository: Send + Sync {
    /// Inserts a batch of ideas atomically. Either every idea lands or none
    /// does, so a half-written generation result is never visible.
    async fn create_batch(
        &self,
        ideas: Vec<ArticleIdea>,
    ) -> Result<Vec<ArticleIdea>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleIdea>, RepositoryError>;

    async fn update(&self, idea: ArticleIdea) -> Result<ArticleIdea, RepositoryError>;

    async fn list_by_job(&self, job_id: Uuid) -> Result<Vec<ArticleIdea>, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryIdeaRepository {
    store: Mutex<HashMap<Uuid, ArticleIdea>>,
}

impl InMemoryIdeaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire_lock<T>(lock: &Mutex<T>) -> Result<MutexGuard<T>, RepositoryError> {
        Ok(lock.lock().await)
    }
}

#[async_trait]
impl IdeaRepository for InMemoryIdeaRepository {
    async fn create_batch(
        &self,
        ideas: Vec<ArticleIdea>,
    ) -> Result<Vec<ArticleIdea>, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        // Validate the whole batch before touching the map.
        for idea in &ideas {
            if store.contains_key(&idea.id) {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "idea with ID '{}' already exists",
                    idea.id
                )));
            }
        }
        for idea in &ideas {
            store.insert(idea.id, idea.clone());
        }
        Ok(ideas)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ArticleIdea>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store.get(&id).cloned())
    }

    async fn update(&self, idea: ArticleIdea) -> Result<ArticleIdea, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if !store.contains_key(&idea.id) {
            return Err(RepositoryError::NotFound(format!(
                "idea with ID '{}' not found",
                idea.id
            )));
        }
        store.insert(idea.id, idea.clone());
        Ok(idea)
    }

    async fn list_by_job(&self, job_id: Uuid) -> Result<Vec<ArticleIdea>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        let mut ideas: Vec<_> = store
            .values()
            .filter(|idea| idea.job_id == job_id)
            .cloned()
            .collect();
        ideas.sort_by_key(|idea| idea.created_at);
        Ok(ideas)
    }
}
