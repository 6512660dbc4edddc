//! Notification endpoints

use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    authz::{Action, ResourceKind, ResourceScope, authorize},
    error::ApiError,
    models::notification::Notification,
    response,
    scope::RequestContext,
    state::AppState,
};

/// Everything addressed to the caller, broadcasts included
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::List,
        &ResourceScope::of(ResourceKind::Notification),
    )?;

    let notifications = state
        .notification_repository
        .list_for_recipient(ctx.actor.id)
        .await
        .map_err(|e| {
            error!("Failed to list notifications: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(notifications))
}

/// Mark one notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = load_notification(&state, id).await?;

    authorize(
        &ctx,
        Action::Update,
        &ResourceScope::of(ResourceKind::Notification).owned_by(notification.user_id),
    )?;

    let notification = state
        .notification_repository
        .mark_read(id)
        .await
        .map_err(|e| {
            error!("Failed to mark notification read: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .ok_or_else(|| ApiError::not_found("Notification"))?;

    Ok(response::ok(notification))
}

/// Delete one notification
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = load_notification(&state, id).await?;

    authorize(
        &ctx,
        Action::Delete,
        &ResourceScope::of(ResourceKind::Notification).owned_by(notification.user_id),
    )?;

    state
        .notification_repository
        .delete(id)
        .await
        .map_err(|e| {
            error!("Failed to delete notification: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::message("Notification deleted successfully"))
}

async fn load_notification(state: &AppState, id: Uuid) -> Result<Notification, ApiError> {
    state
        .notification_repository
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!("Failed to get notification: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .ok_or_else(|| ApiError::not_found("Notification"))
}
