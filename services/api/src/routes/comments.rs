//! Comment endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    authz::{Action, ResourceKind, ResourceScope, authorize},
    error::{ApiError, ValidationErrors},
    models::comment::{
        Comment, CommentListQuery, CommentTarget, CreateCommentRequest, UpdateCommentRequest,
    },
    response,
    scope::RequestContext,
    state::AppState,
};

/// List comments on one commentable record
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&ctx, Action::List, &ResourceScope::of(ResourceKind::Comment))?;

    let target = parse_target(&query.commentable_type)?;
    let comments = state
        .comment_repository
        .list_for_target(target, query.commentable_id)
        .await
        .map_err(|e| {
            error!("Failed to list comments: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(comments))
}

/// Attach a comment to a commentable record
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::Create,
        &ResourceScope::of(ResourceKind::Comment).owned_by(ctx.actor.id),
    )?;

    let target = parse_target(&payload.commentable_type)?;

    let body = payload.body.trim();
    if body.is_empty() {
        return Err(ApiError::Validation(ValidationErrors::single(
            "body",
            "The body field is required",
        )));
    }

    let comment = state
        .comment_repository
        .create(target, payload.commentable_id, ctx.actor.id, body)
        .await
        .map_err(|e| {
            error!("Failed to create comment: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::created(comment))
}

/// Edit the body of a comment
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = load_comment(&state, id).await?;

    authorize(
        &ctx,
        Action::Update,
        &ResourceScope::of(ResourceKind::Comment).owned_by(comment.author_id),
    )?;

    let body = payload.body.trim();
    if body.is_empty() {
        return Err(ApiError::Validation(ValidationErrors::single(
            "body",
            "The body field is required",
        )));
    }

    let comment = state
        .comment_repository
        .update_body(id, body)
        .await
        .map_err(|e| {
            error!("Failed to update comment: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(comment))
}

/// Delete a comment
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = load_comment(&state, id).await?;

    authorize(
        &ctx,
        Action::Delete,
        &ResourceScope::of(ResourceKind::Comment).owned_by(comment.author_id),
    )?;

    state.comment_repository.delete(id).await.map_err(|e| {
        error!("Failed to delete comment: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    Ok(response::message("Comment deleted successfully"))
}

async fn load_comment(state: &AppState, id: Uuid) -> Result<Comment, ApiError> {
    state
        .comment_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get comment: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .ok_or_else(|| ApiError::not_found("Comment"))
}

fn parse_target(raw: &str) -> Result<CommentTarget, ApiError> {
    raw.parse::<CommentTarget>().map_err(|_| {
        ApiError::Validation(ValidationErrors::single(
            "commentable_type",
            "The selected commentable_type is invalid",
        ))
    })
}
