//! Admin permission endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use crate::{
    authz::{Action, ResourceKind, ResourceScope, authorize},
    error::ApiError,
    models::{Role, permission::PermissionFlags},
    response,
    scope::RequestContext,
    state::AppState,
};

/// List every admin with their effective capability flags
pub async fn list_admin_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::List,
        &ResourceScope::of(ResourceKind::AdminPermission),
    )?;

    let admins = state
        .permission_repository
        .list_admins_with_flags()
        .await
        .map_err(|e| {
            error!("Failed to list admin permissions: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(admins))
}

/// Replace the capability flags of one admin
pub async fn update_admin_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(admin_id): Path<Uuid>,
    Json(flags): Json<PermissionFlags>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(
        &ctx,
        Action::Update,
        &ResourceScope::of(ResourceKind::AdminPermission).owned_by(admin_id),
    )?;

    let target = state
        .actor_repository
        .find_by_id(admin_id)
        .await
        .map_err(|e| {
            error!("Failed to look up admin: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    // Flags only attach to admin accounts.
    match target {
        Some(actor) if actor.role == Role::Admin => {}
        Some(_) => return Err(ApiError::NotFound("User is not an admin".to_string())),
        None => return Err(ApiError::not_found("User")),
    }

    let stored = state
        .permission_repository
        .upsert(admin_id, &flags)
        .await
        .map_err(|e| {
            error!("Failed to update admin permissions: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(response::ok(stored))
}

/// The caller's own capability flags
pub async fn my_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<impl IntoResponse, ApiError> {
    // Flags exist for admins only, whatever the caller's rank.
    if ctx.actor.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "Only admins have permissions".to_string(),
        ));
    }

    authorize(
        &ctx,
        Action::Read,
        &ResourceScope::of(ResourceKind::AdminPermission).owned_by(ctx.actor.id),
    )?;

    let flags = state
        .permission_repository
        .get(ctx.actor.id)
        .await
        .map_err(|e| {
            error!("Failed to load own permissions: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .unwrap_or_default();

    Ok(response::ok(flags))
}
