//! Comment repository

use anyhow::Result;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::comment::{Comment, CommentTarget};

const COMMENT_COLUMNS: &str =
    "id, commentable_type, commentable_id, author_id, body, created_at, updated_at";

/// Comment repository for database operations
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    /// Create a new comment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach a comment to a record
    pub async fn create(
        &self,
        target: CommentTarget,
        commentable_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Comment> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO comments (commentable_type, commentable_id, author_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(target.as_str())
        .bind(commentable_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        map_comment(row)
    }

    /// Find a comment by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_comment).transpose()
    }

    /// Replace the body of a comment
    pub async fn update_body(&self, id: Uuid, body: &str) -> Result<Comment> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE comments
            SET body = $2, updated_at = now()
            WHERE id = $1
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        map_comment(row)
    }

    /// Delete a comment by ID
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All comments on one record, oldest first
    pub async fn list_for_target(
        &self,
        target: CommentTarget,
        commentable_id: Uuid,
    ) -> Result<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE commentable_type = $1 AND commentable_id = $2
            ORDER BY created_at ASC
            "#
        ))
        .bind(target.as_str())
        .bind(commentable_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_comment).collect()
    }
}

fn map_comment(row: sqlx::postgres::PgRow) -> Result<Comment> {
    let commentable_type: String = row.get("commentable_type");
    let commentable_type = CommentTarget::from_str(&commentable_type)
        .map_err(|e| anyhow::anyhow!("Corrupt comment row: {}", e))?;

    Ok(Comment {
        id: row.get("id"),
        commentable_type,
        commentable_id: row.get("commentable_id"),
        author_id: row.get("author_id"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
