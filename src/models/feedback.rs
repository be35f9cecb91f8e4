use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::error::AppError;
use crate::validation::{is_valid_comment, is_valid_usn, parse_id, parse_rating, UsnPolicy};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackView {
    pub feedback_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub event_id: i32,
    pub event_name: String,
    pub usn: String,
    pub student_name: String,
}

/// `?rating=` filter on the feedback dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingFilter {
    #[default]
    All,
    Good,
    Average,
    Poor,
}

impl RatingFilter {
    /// Unknown values fall back to no filtering.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "good" => RatingFilter::Good,
            "average" => RatingFilter::Average,
            "poor" => RatingFilter::Poor,
            _ => RatingFilter::All,
        }
    }

    pub fn sql_clause(self) -> Option<&'static str> {
        match self {
            RatingFilter::All => None,
            RatingFilter::Good => Some("f.rating >= 4"),
            RatingFilter::Average => Some("f.rating = 3"),
            RatingFilter::Poor => Some("f.rating <= 2"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub usn: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub event_id: i32,
    pub usn: String,
    pub rating: i16,
    pub comment: Option<String>,
}

impl FeedbackForm {
    pub fn trimmed(self) -> Self {
        Self {
            event_id: self.event_id.trim().to_string(),
            usn: self.usn.trim().to_string(),
            rating: self.rating.trim().to_string(),
            comment: self.comment.trim().to_string(),
        }
    }

    pub fn validate(&self, policy: UsnPolicy) -> Result<NewFeedback, AppError> {
        let event_id = parse_id(&self.event_id)
            .ok_or_else(|| AppError::ValidationError("Please select a valid event.".into()))?;
        if !is_valid_usn(&self.usn, policy) {
            return Err(AppError::ValidationError(policy.requirement().into()));
        }
        let rating = parse_rating(&self.rating)
            .ok_or_else(|| AppError::ValidationError("Rating must be between 1 and 5.".into()))?;
        if !is_valid_comment(&self.comment) {
            return Err(AppError::ValidationError(
                "Comment must be at most 500 characters.".into(),
            ));
        }

        Ok(NewFeedback {
            event_id,
            usn: self.usn.clone(),
            rating,
            comment: (!self.comment.is_empty()).then(|| self.comment.clone()),
        })
    }
}
