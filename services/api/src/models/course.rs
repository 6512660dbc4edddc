//! Course models for the API service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Upcoming,
    Active,
    Completed,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Upcoming => "upcoming",
            CourseStatus::Active => "active",
            CourseStatus::Completed => "completed",
        }
    }
}

impl FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(CourseStatus::Upcoming),
            "active" => Ok(CourseStatus::Active),
            "completed" => Ok(CourseStatus::Completed),
            other => Err(format!("Unknown course status: {}", other)),
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Course record, the tenancy unit of the platform
#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: Uuid,
    pub course_code: String,
    pub name: String,
    pub course_type: String,
    pub duration_weeks: i32,
    pub status: CourseStatus,
    pub start_date: NaiveDate,
    pub instructor_id: Option<Uuid>,
    pub trainee_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
