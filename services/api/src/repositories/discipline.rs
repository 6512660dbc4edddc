//! Discipline issue repository

use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::discipline::{
    ApprovalStatus, DisciplineIssue, DisciplineIssueFilter, IssueStatus, NewDisciplineIssue,
    Severity,
};
use crate::scope::CourseFilter;

const ISSUE_COLUMNS: &str = "id, user_id, course_id, reported_by, title, description, severity, \
     status, incident_date, document_path, resolution_notes, resolved_at, \
     approval_status, approved_by, approved_at, rejection_reason, created_at, updated_at";

/// Ordering shared by every listing: issues awaiting review first, then
/// approved, then rejected; newest incidents within each bucket. The
/// states are ranked explicitly because their alphabetical order does
/// not match the workflow order.
const ISSUE_ORDER: &str = " ORDER BY CASE approval_status \
     WHEN 'pending' THEN 0 WHEN 'approved' THEN 1 ELSE 2 END, \
     incident_date DESC, created_at DESC";

/// Discipline issue repository for database operations
#[derive(Clone)]
pub struct DisciplineIssueRepository {
    pool: PgPool,
}

impl DisciplineIssueRepository {
    /// Create a new discipline issue repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new issue. The workflow status always starts pending;
    /// the approval status is decided by the caller's role.
    pub async fn create(&self, new: &NewDisciplineIssue) -> Result<DisciplineIssue> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO discipline_issues (
                user_id, course_id, reported_by, title, description, severity,
                status, incident_date, document_path, approval_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9)
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(new.user_id)
        .bind(new.course_id)
        .bind(new.reported_by)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.severity.as_str())
        .bind(new.incident_date)
        .bind(&new.document_path)
        .bind(new.approval_status.as_str())
        .fetch_one(&self.pool)
        .await?;

        map_issue(row)
    }

    /// Find an issue by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DisciplineIssue>> {
        let row = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM discipline_issues WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_issue).transpose()
    }

    /// List issues visible through `course`, narrowed by the filters
    pub async fn list(
        &self,
        course: CourseFilter,
        filter: &DisciplineIssueFilter,
    ) -> Result<Vec<DisciplineIssue>> {
        let course = match course {
            CourseFilter::Nothing => return Ok(Vec::new()),
            other => other,
        };

        let mut query = build_list_query(course, filter);
        let rows = query.build().fetch_all(&self.pool).await?;

        rows.into_iter().map(map_issue).collect()
    }

    /// Persist field edits on an issue
    pub async fn update(&self, issue: &DisciplineIssue) -> Result<DisciplineIssue> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE discipline_issues
            SET title = $2, description = $3, severity = $4, status = $5,
                incident_date = $6, document_path = $7, resolution_notes = $8,
                resolved_at = $9, updated_at = now()
            WHERE id = $1
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(issue.id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.severity.as_str())
        .bind(issue.status.as_str())
        .bind(issue.incident_date)
        .bind(&issue.document_path)
        .bind(&issue.resolution_notes)
        .bind(issue.resolved_at)
        .fetch_one(&self.pool)
        .await?;

        map_issue(row)
    }

    /// Approve an issue, stamping the reviewer. The `approval_status`
    /// guard in the WHERE clause makes the review decision atomic:
    /// `None` means the issue was missing or already processed.
    pub async fn approve(&self, id: Uuid, reviewer: Uuid) -> Result<Option<DisciplineIssue>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE discipline_issues
            SET approval_status = 'approved', approved_by = $2, approved_at = now(),
                updated_at = now()
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reviewer)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_issue).transpose()
    }

    /// Reject an issue with a reason, stamping the reviewer. Same
    /// at-most-once guard as [`approve`](Self::approve).
    pub async fn reject(
        &self,
        id: Uuid,
        reviewer: Uuid,
        reason: &str,
    ) -> Result<Option<DisciplineIssue>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE discipline_issues
            SET approval_status = 'rejected', approved_by = $2, approved_at = now(),
                rejection_reason = $3, updated_at = now()
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reviewer)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_issue).transpose()
    }

    /// Delete an issue by ID
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM discipline_issues WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn build_list_query(
    course: CourseFilter,
    filter: &DisciplineIssueFilter,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {ISSUE_COLUMNS} FROM discipline_issues WHERE 1 = 1"
    ));

    if let CourseFilter::Course(course_id) = course {
        query.push(" AND course_id = ").push_bind(course_id);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(severity) = filter.severity {
        query.push(" AND severity = ").push_bind(severity.as_str());
    }
    if let Some(approval_status) = filter.approval_status {
        query
            .push(" AND approval_status = ")
            .push_bind(approval_status.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        query
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    query.push(ISSUE_ORDER);
    query
}

fn map_issue(row: sqlx::postgres::PgRow) -> Result<DisciplineIssue> {
    let severity: String = row.get("severity");
    let severity =
        Severity::from_str(&severity).map_err(|e| anyhow::anyhow!("Corrupt issue row: {}", e))?;

    let status: String = row.get("status");
    let status =
        IssueStatus::from_str(&status).map_err(|e| anyhow::anyhow!("Corrupt issue row: {}", e))?;

    let approval_status: String = row.get("approval_status");
    let approval_status = ApprovalStatus::from_str(&approval_status)
        .map_err(|e| anyhow::anyhow!("Corrupt issue row: {}", e))?;

    Ok(DisciplineIssue {
        id: row.get("id"),
        user_id: row.get("user_id"),
        course_id: row.get("course_id"),
        reported_by: row.get("reported_by"),
        title: row.get("title"),
        description: row.get("description"),
        severity,
        status,
        incident_date: row.get("incident_date"),
        document_path: row.get("document_path"),
        resolution_notes: row.get("resolution_notes"),
        resolved_at: row.get("resolved_at"),
        approval_status,
        approved_by: row.get("approved_by"),
        approved_at: row.get("approved_at"),
        rejection_reason: row.get("rejection_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_query_keeps_only_the_ordering() {
        let query = build_list_query(CourseFilter::Any, &DisciplineIssueFilter::default());
        let sql = query.sql();

        assert!(!sql.contains("AND course_id"));
        assert!(sql.contains("ORDER BY CASE approval_status"));
        assert!(sql.contains("incident_date DESC, created_at DESC"));
    }

    #[test]
    fn course_scope_and_filters_become_bound_clauses() {
        let filter = DisciplineIssueFilter {
            course_id: None,
            user_id: Some(Uuid::new_v4()),
            status: Some(IssueStatus::Investigating),
            severity: Some(Severity::High),
            approval_status: Some(ApprovalStatus::Pending),
            search: Some("uniform".to_string()),
        };
        let query = build_list_query(CourseFilter::Course(Uuid::new_v4()), &filter);
        let sql = query.sql();

        assert!(sql.contains("AND course_id = $1"));
        assert!(sql.contains("AND user_id = $2"));
        assert!(sql.contains("AND status = $3"));
        assert!(sql.contains("AND severity = $4"));
        assert!(sql.contains("AND approval_status = $5"));
        assert!(sql.contains("title ILIKE $6"));
        assert!(sql.contains("description ILIKE $7"));
    }

    #[test]
    fn pending_ranks_ahead_of_the_other_states() {
        // 'approved' sorts before 'pending' as plain text, so the query
        // must rank states rather than sort the column.
        let query = build_list_query(CourseFilter::Any, &DisciplineIssueFilter::default());
        assert!(
            query
                .sql()
                .contains("WHEN 'pending' THEN 0 WHEN 'approved' THEN 1 ELSE 2")
        );
    }
}
