//! Business profile read by the publisher worker to assemble AI context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub description: String,
    pub primary_objective: String,
    pub secondary_objective: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    pub brand_file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BusinessProfile {
    /// Objectives string handed to the AI agent, primary first.
    pub fn objectives(&self) -> String {
        match &self.secondary_objective {
            Some(secondary) => format!("{}, {}", self.primary_objective, secondary),
            None => self.primary_objective.clone(),
        }
    }

    pub fn location(&self) -> String {
        format!("{}, {}, {}", self.city, self.state, self.country)
    }

    /// A brand tone is only suggested when the user uploaded brand material.
    pub fn brand_tone(&self) -> Option<String> {
        self.brand_file_url
            .as_ref()
            .map(|_| "professional and trustworthy".to_string())
    }
}
