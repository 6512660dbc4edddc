//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{Role, User};

const USER_COLUMNS: &str = "id, user_code, full_name, email, role, course_id, password_hash, \
                            created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by user code or email
    pub async fn find_by_code_or_email(&self, user_code_or_email: &str) -> Result<Option<User>> {
        info!("Finding user by code or email: {}", user_code_or_email);

        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE user_code = $1 OR email = $1
            "#,
        ))
        .bind(user_code_or_email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_user).transpose()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_user).transpose()
    }

    /// Verify a user's password
    pub async fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

        Ok(result.is_ok())
    }

    /// Replace a user's password hash
    pub async fn update_password(&self, id: Uuid, new_password: &str) -> Result<()> {
        info!("Updating password for user: {}", id);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(new_password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_user(row: PgRow) -> Result<User> {
    let role: String = row.get("role");
    let role = role
        .parse::<Role>()
        .map_err(|e| anyhow::anyhow!("Corrupt user row: {}", e))?;

    Ok(User {
        id: row.get("id"),
        user_code: row.get("user_code"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role,
        course_id: row.get("course_id"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
