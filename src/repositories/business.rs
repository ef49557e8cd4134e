//! Business profile storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::models::{BusinessProfile, RepositoryError};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BusinessProfileRepository: Send + Sync {
    async fn create(&self, profile: BusinessProfile) -> Result<BusinessProfile, RepositoryError>;

    /// A user has at most one profile.
    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<BusinessProfile>, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryBusinessProfileRepository {
    store: Mutex<HashMap<Uuid, BusinessProfile>>,
}

impl InMemoryBusinessProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire_lock<T>(lock: &Mutex<T>) -> Result<MutexGuard<T>, RepositoryError> {
        Ok(lock.lock().await)
    }
}

#[async_trait]
impl BusinessProfileRepository for InMemoryBusinessProfileRepository {
    async fn create(&self, profile: BusinessProfile) -> Result<BusinessProfile, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&profile.user_id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "user '{}' already has a business profile",
                profile.user_id
            )));
        }
        store.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<BusinessProfile>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store.get(&user_id).cloned())
    }
}
