//! Domain models for the academy API service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod comment;
pub mod course;
pub mod discipline;
pub mod notification;
pub mod permission;

/// Roles recognised by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Instructor,
    Doctor,
    Trainee,
}

impl Role {
    /// Database representation of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Doctor => "doctor",
            Role::Trainee => "trainee",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "instructor" => Ok(Role::Instructor),
            "doctor" => Ok(Role::Doctor),
            "trainee" => Ok(Role::Trainee),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform account as seen by the API service
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub user_code: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub course_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
