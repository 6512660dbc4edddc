//! Polymorphic comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Record types a comment may be attached to. The set is closed; any
/// other target string is rejected at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentTarget {
    Patient,
    MedicalReport,
    AttendanceRecord,
}

impl CommentTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentTarget::Patient => "patient",
            CommentTarget::MedicalReport => "medical_report",
            CommentTarget::AttendanceRecord => "attendance_record",
        }
    }
}

impl FromStr for CommentTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(CommentTarget::Patient),
            "medical_report" => Ok(CommentTarget::MedicalReport),
            "attendance_record" => Ok(CommentTarget::AttendanceRecord),
            other => Err(format!("Unknown commentable type: {}", other)),
        }
    }
}

impl fmt::Display for CommentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comment attached to a commentable record
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub commentable_type: CommentTarget,
    pub commentable_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a comment
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub commentable_type: String,
    pub commentable_id: Uuid,
    pub body: String,
}

/// Payload for editing a comment body
#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub body: String,
}

/// Query parameters for listing comments on one record
#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    pub commentable_type: String,
    pub commentable_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_set_is_closed() {
        assert!("patient".parse::<CommentTarget>().is_ok());
        assert!("medical_report".parse::<CommentTarget>().is_ok());
        assert!("attendance_record".parse::<CommentTarget>().is_ok());
        assert!("grade".parse::<CommentTarget>().is_err());
        assert!("Patient".parse::<CommentTarget>().is_err());
    }
}
