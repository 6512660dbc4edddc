//! API service routes

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::{AppState, middleware::auth_middleware, storage::MAX_DOCUMENT_BYTES};

pub mod comments;
pub mod discipline;
pub mod notifications;
pub mod permissions;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/discipline-issues",
            get(discipline::list_issues).post(discipline::create_issue),
        )
        .route(
            "/discipline-issues/:id",
            get(discipline::get_issue)
                .put(discipline::update_issue)
                .delete(discipline::delete_issue),
        )
        .route(
            "/discipline-issues/:id/document/download",
            get(discipline::download_document),
        )
        .route("/discipline-issues/:id/approve", post(discipline::approve_issue))
        .route("/discipline-issues/:id/reject", post(discipline::reject_issue))
        .route("/admin/permissions", get(permissions::list_admin_permissions))
        .route("/admin/permissions/my", get(permissions::my_permissions))
        .route(
            "/admin/permissions/:admin_id",
            put(permissions::update_admin_permissions),
        )
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/:id",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/:id/read",
            post(notifications::mark_notification_read),
        )
        .route("/notifications/:id", delete(notifications::delete_notification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        // Uploads are capped per document; leave headroom for the rest
        // of the multipart body.
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + 1024 * 1024))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "academy-api"
    }))
}
