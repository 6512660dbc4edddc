//! Discipline issue endpoints
//!
//! Issues are created by course staff, reviewed by super admins on a
//! separate approval axis, and may carry one uploaded document stored
//! on the private disk.

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    authz::{Action, ResourceKind, ResourceScope, authorize},
    error::{ApiError, ValidationErrors},
    models::discipline::{
        ApprovalStatus, DisciplineIssue, DisciplineIssueFilter, IssueStatus, NewDisciplineIssue,
        Severity,
    },
    models::notification::NewNotification,
    response,
    scope::{CourseScope, RequestContext},
    state::AppState,
    storage::MAX_DOCUMENT_BYTES,
};

/// List discipline issues visible to the caller
pub async fn list_issues(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(filter): Query<DisciplineIssueFilter>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::List,
        &ResourceScope::of(ResourceKind::DisciplineIssue),
    )?;

    let course = ctx.list_filter(filter.course_id);
    let issues = state
        .discipline_repository
        .list(course, &filter)
        .await
        .map_err(|e| {
            error!("Failed to list discipline issues: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(issues))
}

/// Get a discipline issue by ID
pub async fn get_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = load_issue(&state, id).await?;

    authorize(
        &ctx,
        Action::Read,
        &ResourceScope::of(ResourceKind::DisciplineIssue).in_course(issue.course_id),
    )?;

    Ok(response::ok(issue))
}

/// Create a discipline issue from a multipart form
pub async fn create_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::Create,
        &ResourceScope::of(ResourceKind::DisciplineIssue),
    )?;

    let form = read_issue_form(multipart).await?;
    let input = validate_create(form).map_err(ApiError::Validation)?;

    let subject = state
        .actor_repository
        .find_by_id(input.user_id)
        .await
        .map_err(|e| {
            error!("Failed to look up issue subject: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .ok_or_else(|| ApiError::not_found("User"))?;

    // Resolve the course the issue lands in. Scoped staff are pinned to
    // their own course; super admins may name one or inherit the
    // subject's assignment.
    let course_id = match ctx.scope {
        CourseScope::Course(own) => {
            if subject.course_id != Some(own) {
                return Err(ApiError::Forbidden(
                    "User does not belong to your course".to_string(),
                ));
            }
            own
        }
        CourseScope::Unscoped => {
            let course_id = input.course_id.or(subject.course_id).ok_or_else(|| {
                ApiError::Validation(ValidationErrors::single(
                    "course_id",
                    "The course_id field is required",
                ))
            })?;
            let known = state
                .course_repository
                .find_by_id(course_id)
                .await
                .map_err(|e| {
                    error!("Failed to look up course: {}", e);
                    ApiError::Internal(e.to_string())
                })?;
            if known.is_none() {
                return Err(ApiError::Validation(ValidationErrors::single(
                    "course_id",
                    "The selected course_id is invalid",
                )));
            }
            course_id
        }
        // The gate already refused unassigned staff above.
        CourseScope::Unassigned => {
            return Err(ApiError::Forbidden(
                "You must be assigned to a course".to_string(),
            ));
        }
    };

    // A failed upload degrades to an issue without an attachment rather
    // than losing the report.
    let document_path = match &input.document {
        Some((file_name, bytes)) => {
            match state
                .document_storage
                .save("discipline_documents", file_name, bytes)
                .await
            {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Failed to store discipline document: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let new = NewDisciplineIssue {
        user_id: subject.id,
        course_id,
        reported_by: ctx.actor.id,
        title: input.title,
        description: input.description,
        severity: input.severity,
        incident_date: input.incident_date,
        document_path,
        approval_status: ApprovalStatus::initial_for(ctx.actor.role),
    };

    let issue = state.discipline_repository.create(&new).await.map_err(|e| {
        error!("Failed to create discipline issue: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    Ok(response::created(issue))
}

/// Update a discipline issue from a multipart form
pub async fn update_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut issue = load_issue(&state, id).await?;

    authorize(
        &ctx,
        Action::Update,
        &ResourceScope::of(ResourceKind::DisciplineIssue).in_course(issue.course_id),
    )?;

    let form = read_issue_form(multipart).await?;
    let changes = validate_update(form).map_err(ApiError::Validation)?;

    if let Some(title) = changes.title {
        issue.title = title;
    }
    if let Some(description) = changes.description {
        issue.description = description;
    }
    if let Some(severity) = changes.severity {
        issue.severity = severity;
    }
    if let Some(incident_date) = changes.incident_date {
        issue.incident_date = incident_date;
    }
    if let Some(notes) = changes.resolution_notes {
        issue.resolution_notes = Some(notes);
    }
    if let Some(status) = changes.status {
        issue.transition_status(status, Utc::now());
    }

    if let Some((file_name, bytes)) = &changes.document {
        // Replacing an attachment removes the prior file first.
        if let Some(old) = issue.document_path.take() {
            state.document_storage.delete(&old).await;
        }
        issue.document_path = match state
            .document_storage
            .save("discipline_documents", file_name, bytes)
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to store discipline document: {}", e);
                None
            }
        };
    }

    let issue = state
        .discipline_repository
        .update(&issue)
        .await
        .map_err(|e| {
            error!("Failed to update discipline issue: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(issue))
}

/// Delete a discipline issue and its attachment
pub async fn delete_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = load_issue(&state, id).await?;

    authorize(
        &ctx,
        Action::Delete,
        &ResourceScope::of(ResourceKind::DisciplineIssue).in_course(issue.course_id),
    )?;

    if let Some(path) = &issue.document_path {
        state.document_storage.delete(path).await;
    }

    state.discipline_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete discipline issue: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    Ok(response::message("Discipline issue deleted successfully"))
}

/// Download the document attached to an issue
pub async fn download_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = load_issue(&state, id).await?;

    authorize(
        &ctx,
        Action::Read,
        &ResourceScope::of(ResourceKind::DisciplineIssue).in_course(issue.course_id),
    )?;

    let path = issue
        .document_path
        .as_deref()
        .ok_or_else(|| ApiError::not_found("Document"))?;

    let bytes = state
        .document_storage
        .read(path)
        .await
        .map_err(|e| {
            error!("Failed to read discipline document: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .ok_or_else(|| ApiError::not_found("Document file"))?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", display_file_name(path)),
        ),
    ];

    Ok((headers, bytes))
}

/// Approve a pending discipline issue
pub async fn approve_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::Approve,
        &ResourceScope::of(ResourceKind::DisciplineIssue),
    )?;

    let approved = state
        .discipline_repository
        .approve(id, ctx.actor.id)
        .await
        .map_err(|e| {
            error!("Failed to approve discipline issue: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    match approved {
        Some(issue) => {
            notify_reporter(&state, &issue, "approved").await;
            Ok(response::ok(issue))
        }
        None => Err(review_conflict(&state, id).await),
    }
}

/// Payload for rejecting an issue
#[derive(Debug, Deserialize)]
pub struct RejectIssueRequest {
    #[serde(default)]
    pub rejection_reason: String,
}

/// Reject a pending discipline issue with a reason
pub async fn reject_issue(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::Reject,
        &ResourceScope::of(ResourceKind::DisciplineIssue),
    )?;

    let reason = payload.rejection_reason.trim();
    if reason.is_empty() {
        return Err(ApiError::Validation(ValidationErrors::single(
            "rejection_reason",
            "The rejection_reason field is required",
        )));
    }
    if reason.chars().count() > 1000 {
        return Err(ApiError::Validation(ValidationErrors::single(
            "rejection_reason",
            "The rejection_reason may not be greater than 1000 characters",
        )));
    }

    let rejected = state
        .discipline_repository
        .reject(id, ctx.actor.id, reason)
        .await
        .map_err(|e| {
            error!("Failed to reject discipline issue: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    match rejected {
        Some(issue) => {
            notify_reporter(&state, &issue, "rejected").await;
            Ok(response::ok(issue))
        }
        None => Err(review_conflict(&state, id).await),
    }
}

/// Distinguishes "already reviewed" from "no such issue" after a review
/// update matched nothing
async fn review_conflict(state: &AppState, id: Uuid) -> ApiError {
    match state.discipline_repository.find_by_id(id).await {
        Ok(Some(_)) => {
            ApiError::Conflict("This discipline issue has already been processed".to_string())
        }
        Ok(None) => ApiError::not_found("Discipline issue"),
        Err(e) => {
            error!("Failed to re-check discipline issue: {}", e);
            ApiError::Internal(e.to_string())
        }
    }
}

/// Best-effort reporter notification; failures are logged, never surfaced
async fn notify_reporter(state: &AppState, issue: &DisciplineIssue, decision: &str) {
    let notification = NewNotification {
        user_id: Some(issue.reported_by),
        kind: "discipline_issue_review".to_string(),
        title: format!("Discipline issue {}", decision),
        message: format!("Your discipline issue \"{}\" has been {}", issue.title, decision),
        action_url: Some(format!("/discipline-issues/{}", issue.id)),
    };

    if let Err(e) = state.notification_repository.create(&notification).await {
        warn!(
            "Failed to notify reporter {} about issue {}: {}",
            issue.reported_by, issue.id, e
        );
    }
}

async fn load_issue(state: &AppState, id: Uuid) -> Result<DisciplineIssue, ApiError> {
    state
        .discipline_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get discipline issue: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .ok_or_else(|| ApiError::not_found("Discipline issue"))
}

/// Raw multipart fields of a create or update form
#[derive(Debug, Default)]
struct IssueForm {
    user_id: Option<String>,
    course_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    status: Option<String>,
    incident_date: Option<String>,
    resolution_notes: Option<String>,
    document: Option<(String, Vec<u8>)>,
}

async fn read_issue_form(mut multipart: Multipart) -> Result<IssueForm, ApiError> {
    let mut form = IssueForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::Validation(ValidationErrors::single(
            "form",
            format!("Malformed multipart payload: {}", e),
        ))
    })? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "document" {
            let file_name = field.file_name().unwrap_or("document").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                ApiError::Validation(ValidationErrors::single(
                    "document",
                    format!("Failed to read document upload: {}", e),
                ))
            })?;
            if bytes.len() > MAX_DOCUMENT_BYTES {
                return Err(ApiError::Validation(ValidationErrors::single(
                    "document",
                    "The document may not be greater than 10 MB",
                )));
            }
            form.document = Some((file_name, bytes.to_vec()));
            continue;
        }

        let value = field.text().await.map_err(|e| {
            ApiError::Validation(ValidationErrors::single(
                "form",
                format!("Malformed multipart payload: {}", e),
            ))
        })?;

        match name.as_str() {
            "user_id" => form.user_id = Some(value),
            "course_id" => form.course_id = Some(value),
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "severity" => form.severity = Some(value),
            "status" => form.status = Some(value),
            "incident_date" => form.incident_date = Some(value),
            "resolution_notes" => form.resolution_notes = Some(value),
            _ => {}
        }
    }

    Ok(form)
}

/// Validated fields for issue creation
#[derive(Debug)]
struct NewIssueInput {
    user_id: Uuid,
    course_id: Option<Uuid>,
    title: String,
    description: String,
    severity: Severity,
    incident_date: NaiveDate,
    document: Option<(String, Vec<u8>)>,
}

fn validate_create(form: IssueForm) -> Result<NewIssueInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let user_id = match non_empty(form.user_id).as_deref() {
        None => {
            errors.add("user_id", "The user_id field is required");
            None
        }
        Some(v) => match Uuid::parse_str(v) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("user_id", "The user_id must be a valid UUID");
                None
            }
        },
    };

    let course_id = match non_empty(form.course_id).as_deref() {
        None => None,
        Some(v) => match Uuid::parse_str(v) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("course_id", "The course_id must be a valid UUID");
                None
            }
        },
    };

    let title = match non_empty(form.title) {
        None => {
            errors.add("title", "The title field is required");
            None
        }
        Some(v) if v.chars().count() > 255 => {
            errors.add("title", "The title may not be greater than 255 characters");
            None
        }
        Some(v) => Some(v),
    };

    let description = match non_empty(form.description) {
        None => {
            errors.add("description", "The description field is required");
            None
        }
        Some(v) => Some(v),
    };

    let severity = match non_empty(form.severity).as_deref() {
        None => {
            errors.add("severity", "The severity field is required");
            None
        }
        Some(v) => match v.parse::<Severity>() {
            Ok(severity) => Some(severity),
            Err(_) => {
                errors.add("severity", "The selected severity is invalid");
                None
            }
        },
    };

    let incident_date = match non_empty(form.incident_date).as_deref() {
        None => {
            errors.add("incident_date", "The incident_date field is required");
            None
        }
        Some(v) => match NaiveDate::parse_from_str(v, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add("incident_date", "The incident_date is not a valid date");
                None
            }
        },
    };

    match (user_id, title, description, severity, incident_date) {
        (Some(user_id), Some(title), Some(description), Some(severity), Some(incident_date))
            if errors.is_empty() =>
        {
            Ok(NewIssueInput {
                user_id,
                course_id,
                title,
                description,
                severity,
                incident_date,
                document: form.document,
            })
        }
        _ => Err(errors),
    }
}

/// Validated fields for issue updates; absent fields stay untouched
#[derive(Debug, Default)]
struct IssueChanges {
    title: Option<String>,
    description: Option<String>,
    severity: Option<Severity>,
    status: Option<IssueStatus>,
    incident_date: Option<NaiveDate>,
    resolution_notes: Option<String>,
    document: Option<(String, Vec<u8>)>,
}

fn validate_update(form: IssueForm) -> Result<IssueChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut changes = IssueChanges {
        document: form.document,
        ..IssueChanges::default()
    };

    if let Some(title) = non_empty(form.title) {
        if title.chars().count() > 255 {
            errors.add("title", "The title may not be greater than 255 characters");
        } else {
            changes.title = Some(title);
        }
    }

    changes.description = non_empty(form.description);
    changes.resolution_notes = non_empty(form.resolution_notes);

    if let Some(severity) = non_empty(form.severity) {
        match severity.parse::<Severity>() {
            Ok(severity) => changes.severity = Some(severity),
            Err(_) => errors.add("severity", "The selected severity is invalid"),
        }
    }

    if let Some(status) = non_empty(form.status) {
        match status.parse::<IssueStatus>() {
            Ok(status) => changes.status = Some(status),
            Err(_) => errors.add("status", "The selected status is invalid"),
        }
    }

    if let Some(date) = non_empty(form.incident_date) {
        match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
            Ok(date) => changes.incident_date = Some(date),
            Err(_) => errors.add("incident_date", "The incident_date is not a valid date"),
        }
    }

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(errors)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Original name of a stored document, without the collision prefix
fn display_file_name(path: &str) -> &str {
    let base = path.rsplit('/').next().unwrap_or(path);
    base.splitn(2, '_').nth(1).unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_the_core_fields() {
        let errors = validate_create(IssueForm::default()).unwrap_err();
        let value = serde_json::to_value(&errors).unwrap();

        assert_eq!(value["user_id"][0], "The user_id field is required");
        assert_eq!(value["title"][0], "The title field is required");
        assert_eq!(value["description"][0], "The description field is required");
        assert_eq!(value["severity"][0], "The severity field is required");
        assert_eq!(
            value["incident_date"][0],
            "The incident_date field is required"
        );
    }

    #[test]
    fn create_rejects_bad_values_field_by_field() {
        let form = IssueForm {
            user_id: Some("not-a-uuid".to_string()),
            title: Some("x".repeat(256)),
            description: Some("Shoved a classmate".to_string()),
            severity: Some("catastrophic".to_string()),
            incident_date: Some("28-02-2024".to_string()),
            ..IssueForm::default()
        };

        let errors = validate_create(form).unwrap_err();
        let value = serde_json::to_value(&errors).unwrap();

        assert_eq!(value["user_id"][0], "The user_id must be a valid UUID");
        assert_eq!(
            value["title"][0],
            "The title may not be greater than 255 characters"
        );
        assert_eq!(value["severity"][0], "The selected severity is invalid");
        assert_eq!(
            value["incident_date"][0],
            "The incident_date is not a valid date"
        );
    }

    #[test]
    fn create_accepts_a_complete_form() {
        let form = IssueForm {
            user_id: Some(Uuid::new_v4().to_string()),
            title: Some("Absent without leave".to_string()),
            description: Some("Missed the morning muster".to_string()),
            severity: Some("medium".to_string()),
            incident_date: Some("2024-02-28".to_string()),
            ..IssueForm::default()
        };

        let input = validate_create(form).unwrap();
        assert_eq!(input.severity, Severity::Medium);
        assert_eq!(
            input.incident_date,
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()
        );
        assert!(input.course_id.is_none());
    }

    #[test]
    fn update_treats_empty_fields_as_absent() {
        let form = IssueForm {
            title: Some("   ".to_string()),
            status: Some("investigating".to_string()),
            ..IssueForm::default()
        };

        let changes = validate_update(form).unwrap();
        assert!(changes.title.is_none());
        assert_eq!(changes.status, Some(IssueStatus::Investigating));
    }

    #[test]
    fn update_rejects_an_unknown_status() {
        let form = IssueForm {
            status: Some("archived".to_string()),
            ..IssueForm::default()
        };

        let errors = validate_update(form).unwrap_err();
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["status"][0], "The selected status is invalid");
    }

    #[test]
    fn download_names_drop_the_collision_prefix() {
        let path = "discipline_documents/550e8400-e29b-41d4-a716-446655440000_report.pdf";
        assert_eq!(display_file_name(path), "report.pdf");
        assert_eq!(display_file_name("plain.pdf"), "plain.pdf");
    }
}
