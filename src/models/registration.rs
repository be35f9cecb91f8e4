use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::error::AppError;
use crate::validation::{is_valid_usn, parse_id, UsnPolicy};

/// A registration joined with its event and student, newest first in every
/// listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationView {
    pub reg_id: i32,
    pub registration_date: DateTime<Utc>,
    pub event_id: i32,
    pub event_name: String,
    pub usn: String,
    pub student_name: String,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub reg_id: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub usn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub reg_id: i32,
    pub event_id: i32,
    pub usn: String,
}

impl RegistrationForm {
    pub fn trimmed(self) -> Self {
        Self {
            reg_id: self.reg_id.trim().to_string(),
            event_id: self.event_id.trim().to_string(),
            usn: self.usn.trim().to_string(),
        }
    }

    /// Format checks only; existence, capacity and uniqueness are settled
    /// against the database when the registration is inserted.
    pub fn validate(&self, policy: UsnPolicy) -> Result<NewRegistration, AppError> {
        let reg_id = parse_id(&self.reg_id)
            .ok_or_else(|| AppError::ValidationError("Registration ID must be a number".into()))?;
        let event_id = parse_id(&self.event_id)
            .ok_or_else(|| AppError::ValidationError("Please choose a valid event".into()))?;
        if !is_valid_usn(&self.usn, policy) {
            return Err(AppError::ValidationError(policy.requirement().into()));
        }

        Ok(NewRegistration {
            reg_id,
            event_id,
            usn: self.usn.clone(),
        })
    }
}
