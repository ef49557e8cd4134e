//! CMS integration settings stored per user.
//!
//! The WordPress application password is kept encrypted at rest; the
//! publisher worker decrypts it just before calling the CMS.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntegrationType {
    WordPress,
}

#[derive(Debug, Error)]
pub enum IntegrationConfigError {
    #[error("integration {0} carries no WordPress configuration")]
    MissingWordPressConfig(Uuid),
}

/// WordPress connection settings; `app_password` holds ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPressConfig {
    pub site_url: String,
    pub username: String,
    pub app_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub integration_type: IntegrationType,
    pub enabled: bool,
    pub wordpress: Option<WordPressConfig>,
    pub created_at: DateTime<Utc>,
}

impl Integration {
    pub fn wordpress(user_id: Uuid, config: WordPressConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            integration_type: IntegrationType::WordPress,
            enabled: true,
            wordpress: Some(config),
            created_at: Utc::now(),
        }
    }

    pub fn wordpress_config(&self) -> Result<&WordPressConfig, IntegrationConfigError> {
        self.wordpress
            .as_ref()
            .ok_or(IntegrationConfigError::MissingWordPressConfig(self.id))
    }
}
