//! Role model and related functionality

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actor role
///
/// Roles are stored as snake_case strings in the `users.role` column and
/// carried verbatim inside JWT claims.
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
    /// The database/wire representation of the role
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::SuperAdmin,
            Role::Admin,
            Role::Instructor,
            Role::Doctor,
            Role::Trainee,
        ] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("manager".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_representation() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
        let role: Role = serde_json::from_str("\"trainee\"").unwrap();
        assert_eq!(role, Role::Trainee);
    }
}
