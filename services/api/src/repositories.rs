//! Repositories for database operations

use anyhow::Result;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{
    Actor, Role,
    course::{Course, CourseStatus},
};

pub mod comments;
pub mod discipline;
pub mod notifications;
pub mod permissions;

const ACTOR_COLUMNS: &str = "id, user_code, full_name, email, role, course_id, created_at, \
                             updated_at";

/// Actor repository for database operations
#[derive(Clone)]
pub struct ActorRepository {
    pool: PgPool,
}

impl ActorRepository {
    /// Create a new actor repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an actor by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Actor>> {
        let row = sqlx::query(&format!(
            "SELECT {ACTOR_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_actor).transpose()
    }
}

fn map_actor(row: sqlx::postgres::PgRow) -> Result<Actor> {
    let role: String = row.get("role");
    let role = Role::from_str(&role).map_err(|e| anyhow::anyhow!("Corrupt user row: {}", e))?;

    Ok(Actor {
        id: row.get("id"),
        user_code: row.get("user_code"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        role,
        course_id: row.get("course_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const COURSE_COLUMNS: &str = "id, course_code, name, course_type, duration_weeks, status, \
                              start_date, instructor_id, trainee_count, created_at, updated_at";

/// Course repository for database operations
#[derive(Clone)]
pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    /// Create a new course repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a course by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>> {
        let row = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_course).transpose()
    }
}

fn map_course(row: sqlx::postgres::PgRow) -> Result<Course> {
    let status: String = row.get("status");
    let status = CourseStatus::from_str(&status)
        .map_err(|e| anyhow::anyhow!("Corrupt course row: {}", e))?;

    Ok(Course {
        id: row.get("id"),
        course_code: row.get("course_code"),
        name: row.get("name"),
        course_type: row.get("course_type"),
        duration_weeks: row.get("duration_weeks"),
        status,
        start_date: row.get("start_date"),
        instructor_id: row.get("instructor_id"),
        trainee_count: row.get("trainee_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
