//! Middleware for JWT token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::error;
use uuid::Uuid;

use crate::{AppState, jwt::TokenType, models::Role};

/// Authenticated actor extracted from a validated access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub user_code: String,
    pub role: Role,
    pub course_id: Option<Uuid>,
}

/// Extract and validate the JWT access token from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer.token();

    // Validate the token
    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    // Refresh tokens never authenticate requests
    if claims.token_type != TokenType::Access {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Check if the token is blacklisted
    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if is_blacklisted {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = AuthUser {
        id: claims.sub,
        user_code: claims.user_code,
        role: claims.role,
        course_id: claims.course_id,
    };

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
