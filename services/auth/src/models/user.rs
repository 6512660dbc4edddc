//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// User entity
///
/// The password hash is never serialized into any response.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub user_code: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub course_id: Option<Uuid>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub user_code_or_email: String,
    pub password: String,
}

/// Self-service password change payload
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            user_code: "ADM-001".to_string(),
            full_name: "Test Admin".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
            course_id: None,
            password_hash: "secret-hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
        assert!(json.contains("ADM-001"));
    }
}
