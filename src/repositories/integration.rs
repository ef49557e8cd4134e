//! CMS integration storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use crate::models::{Integration, IntegrationType, RepositoryError};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn create(&self, integration: Integration) -> Result<Integration, RepositoryError>;

    /// Looks up the enabled integration of the given type for a user.
    /// Disabled integrations are treated as absent.
    async fn find_enabled(
        &self,
        user_id: Uuid,
        integration_type: IntegrationType,
    ) -> Result<Option<Integration>, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryIntegrationRepository {
    store: Mutex<HashMap<Uuid, Integration>>,
}

impl InMemoryIntegrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire_lock<T>(lock: &Mutex<T>) -> Result<MutexGuard<T>, RepositoryError> {
        Ok(lock.lock().await)
    }
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn create(&self, integration: Integration) -> Result<Integration, RepositoryError> {
        let mut store = Self::acquire_lock(&self.store).await?;
        if store.contains_key(&integration.id) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "integration with ID '{}' already exists",
                integration.id
            )));
        }
        store.insert(integration.id, integration.clone());
        Ok(integration)
    }

    async fn find_enabled(
        &self,
        user_id: Uuid,
        integration_type: IntegrationType,
    ) -> Result<Option<Integration>, RepositoryError> {
        let store = Self::acquire_lock(&self.store).await?;
        Ok(store
            .values()
            .find(|i| i.user_id == user_id && i.integration_type == integration_type && i.enabled)
            .cloned())
    }
}
