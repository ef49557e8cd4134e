//! Article storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::models::{Article, RepositoryError};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    async fn create(&self, article: Article) -> Result<Article, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, RepositoryError>;

    async fn update(&self, article: Article) -> Result<Article, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryArticleRepository {
    store: Mutex<HashMap<Uuid, Article>>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire_lock<T>(lock: &Mutex<T>) -> Result<MutexGuard<T>, RepositoryError> {
        Ok(lock.lock().await)
    }
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn create(&self, article: Article) -> Result<Article, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&article.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "article with ID '{}' already exists",
                article.id
            )));
        }
        store.insert(article.id, article.clone());
        Ok(article)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store.get(&id).cloned())
    }

    async fn update(&self, article: Article) -> Result<Article, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if !store.contains_key(&article.id) {
            return Err(RepositoryError::NotFound(format!(
                "article with ID '{}' not found",
                article.id
            )));
        }
        store.insert(article.id, article.clone());
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleStatus;

    #[tokio::test]
    async fn update_replaces_stored_article() {
        let repo = InMemoryArticleRepository::new();
        let article = repo
            .create(Article::new(Uuid::new_v4(), None, "Draft title"))
            .await
            .unwrap();

        let mut updated = article.clone();
        updated.set_published("https://blog.example.com/draft-title");
        repo.update(updated).await.unwrap();

        let found = repo.find_by_id(article.id).await.unwrap().unwrap();
        assert_eq!(found.status, ArticleStatus::Published);
    }
}
