use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod authz;
mod error;
mod middleware;
mod models;
mod repositories;
mod response;
mod routes;
mod scope;
mod state;
mod storage;

use common::database::{DatabaseConfig, init_pool};

use crate::{
    middleware::JwtVerifier,
    repositories::{
        ActorRepository, CourseRepository, comments::CommentRepository,
        discipline::DisciplineIssueRepository, notifications::NotificationRepository,
        permissions::PermissionRepository,
    },
    state::AppState,
    storage::{DocumentStorage, StorageConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let jwt_verifier = JwtVerifier::from_env()?;
    let document_storage = DocumentStorage::new(&StorageConfig::from_env());

    info!("API service initialized successfully");

    let app_state = AppState {
        db_pool: pool.clone(),
        jwt_verifier,
        actor_repository: ActorRepository::new(pool.clone()),
        course_repository: CourseRepository::new(pool.clone()),
        permission_repository: PermissionRepository::new(pool.clone()),
        discipline_repository: DisciplineIssueRepository::new(pool.clone()),
        comment_repository: CommentRepository::new(pool.clone()),
        notification_repository: NotificationRepository::new(pool),
        document_storage,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
    info!("API service listening on 0.0.0.0:3001");

    axum::serve(listener, app).await?;

    Ok(())
}
