//! Article idea entity.
//!
//! Ideas are batch-inserted by the generator worker and afterwards touched
//! only by the web tier (approval and feedback), so workers and handlers
//! never race on the same fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleIdea {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub summary: String,
    pub approved: bool,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ArticleIdea {
    pub fn new(
        user_id: Uuid,
        job_id: Uuid,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_id,
            title: title.into(),
            summary: summary.into(),
            approved: false,
            feedback: None,
            created_at: Utc::now(),
        }
    }

    pub fn approve(&mut self) {
        self.approved = true;
    }

    pub fn set_feedback(&mut self, feedback: impl Into<String>) {
        let feedback = feedback.into();
        self.feedback = if feedback.is_empty() {
            None
        } else {
            Some(feedback)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_idea_is_unapproved() {
        let idea = ArticleIdea::new(Uuid::new_v4(), Uuid::new_v4(), "Title", "Summary");
        assert!(!idea.approved);
        assert!(idea.feedback.is_none());
    }

    #[test]
    fn empty_feedback_clears_field() {
        let mut idea = ArticleIdea::new(Uuid::new_v4(), Uuid::new_v4(), "Title", "Summary");
        idea.set_feedback("too generic");
        assert_eq!(idea.feedback.as_deref(), Some("too generic"));
        idea.set_feedback("");
        assert!(idea.feedback.is_none());
    }
}
