//! Shared application state wired at startup and handed to the workers.

use std::sync::Arc;

use crate::repositories::{
    ArticleJobRepository, ArticleRepository, BusinessProfileRepository, IdeaRepository,
    IntegrationRepository,
};
use crate::services::{AgentService, CmsService};
use crate::utils::FieldEncryption;

#[derive(Clone)]
pub struct AppState {
    pub job_repo: Arc<dyn ArticleJobRepository>,
    pub idea_repo: Arc<dyn IdeaRepository>,
    pub article_repo: Arc<dyn ArticleRepository>,
    pub business_repo: Arc<dyn BusinessProfileRepository>,
    pub integration_repo: Arc<dyn IntegrationRepository>,
    pub agent: Arc<dyn AgentService>,
    pub cms: Arc<dyn CmsService>,
    pub encryption: FieldEncryption,
}
