//! Application state shared across handlers

use sqlx::PgPool;

use crate::middleware::JwtVerifier;
use crate::repositories::{
    ActorRepository, CourseRepository, comments::CommentRepository,
    discipline::DisciplineIssueRepository, notifications::NotificationRepository,
    permissions::PermissionRepository,
};
use crate::storage::DocumentStorage;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_verifier: JwtVerifier,
    pub actor_repository: ActorRepository,
    pub course_repository: CourseRepository,
    pub permission_repository: PermissionRepository,
    pub discipline_repository: DisciplineIssueRepository,
    pub comment_repository: CommentRepository,
    pub notification_repository: NotificationRepository,
    pub document_storage: DocumentStorage,
}
