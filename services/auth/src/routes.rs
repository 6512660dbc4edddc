//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    AppState,
    jwt::TokenType,
    middleware::{AuthUser, auth_middleware},
    models::{LoginCredentials, PasswordChange, Role, User},
    validation,
};

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request for token refresh and logout
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .route("/auth/super-admin/login", post(super_admin_login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Standard sign-in endpoint
///
/// Trainees never authenticate interactively and super admins must use the
/// dedicated super admin endpoint; both are rejected here regardless of
/// whether the password is correct.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Login attempt for: {}", payload.user_code_or_email);

    let user = authenticate(&state, &payload).await?;

    match user.role {
        Role::Trainee => {
            return Err(AuthError::Forbidden(
                "Trainee accounts cannot sign in".to_string(),
            ));
        }
        Role::SuperAdmin => {
            return Err(AuthError::Forbidden(
                "Super admin accounts must use the super admin sign-in".to_string(),
            ));
        }
        _ => {}
    }

    issue_tokens(&state, &user).await
}

/// Super admin sign-in endpoint
pub async fn super_admin_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Super admin login attempt for: {}", payload.user_code_or_email);

    let user = authenticate(&state, &payload).await?;

    if user.role != Role::SuperAdmin {
        warn!(
            "Non super admin account attempted the super admin sign-in: {}",
            user.user_code
        );
        return Err(AuthError::Forbidden(
            "Not a super admin account".to_string(),
        ));
    }

    issue_tokens(&state, &user).await
}

/// Shared credential check with per-identifier rate limiting
async fn authenticate(state: &AppState, payload: &LoginCredentials) -> Result<User, AuthError> {
    let key = payload.user_code_or_email.as_str();

    if !state.rate_limiter.is_allowed(key).await {
        return Err(AuthError::TooManyRequests);
    }

    // Neither a plausible user code nor an email; skip the lookup
    if validation::validate_user_code(key).is_err() && validation::validate_email(key).is_err() {
        return Err(AuthError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_code_or_email(key)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?;

    let Some(user) = user else {
        state.rate_limiter.record_failure(key).await;
        return Err(AuthError::Unauthorized);
    };

    let password_ok = state
        .user_repository
        .verify_password(&user, &payload.password)
        .await
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            AuthError::InternalServerError
        })?;

    if !password_ok {
        state.rate_limiter.record_failure(key).await;
        return Err(AuthError::Unauthorized);
    }

    state.rate_limiter.reset(key).await;

    Ok(user)
}

/// Generate the token pair and store the session
async fn issue_tokens(state: &AppState, user: &User) -> Result<Response, AuthError> {
    let access_token = state.jwt_service.generate_access_token(user).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        AuthError::InternalServerError
    })?;

    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .create_session(user.id, &refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to store session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Refresh token endpoint
///
/// Rotates the refresh token: the presented token is blacklisted for its
/// remaining lifetime and a fresh pair is returned.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Token refresh request");

    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let is_blacklisted = state
        .jwt_service
        .is_token_blacklisted(&state.redis_pool, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check if token is blacklisted: {}", e);
            AuthError::InternalServerError
        })?;

    if is_blacklisted {
        return Err(AuthError::Unauthorized);
    }

    let session_valid = state
        .session_manager
        .is_session_valid(claims.sub, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to check session: {}", e);
            AuthError::InternalServerError
        })?;

    if !session_valid {
        return Err(AuthError::Unauthorized);
    }

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let access_token = state
        .jwt_service
        .generate_access_token(&user)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            AuthError::InternalServerError
        })?;

    let new_refresh_token = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &payload.refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .create_session(user.id, &new_refresh_token)
        .await
        .map_err(|e| {
            error!("Failed to update session in Redis: {}", e);
            AuthError::InternalServerError
        })?;

    let response = TokenResponse {
        access_token,
        refresh_token: new_refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.access_token_expiry(),
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Logout request");

    let claims = state
        .jwt_service
        .validate_token(&payload.refresh_token)
        .map_err(|_| AuthError::Unauthorized)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AuthError::Unauthorized);
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| {
            error!("Failed to get current time: {}", e);
            AuthError::InternalServerError
        })?
        .as_secs();

    let expiry = claims.exp.saturating_sub(now);
    state
        .jwt_service
        .blacklist_token(&state.redis_pool, &payload.refresh_token, expiry)
        .await
        .map_err(|e| {
            error!("Failed to blacklist token: {}", e);
            AuthError::InternalServerError
        })?;

    state
        .session_manager
        .delete_session(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to remove session from Redis: {}", e);
            AuthError::InternalServerError
        })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Return the authenticated actor's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(user))
}

/// Self-service password change
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<PasswordChange>,
) -> Result<impl IntoResponse, AuthError> {
    info!("Password change request for user: {}", auth_user.id);

    let user = state
        .user_repository
        .find_by_id(auth_user.id)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    let password_ok = state
        .user_repository
        .verify_password(&user, &payload.current_password)
        .await
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            AuthError::InternalServerError
        })?;

    if !password_ok {
        return Err(AuthError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    validation::validate_password(&payload.new_password).map_err(AuthError::Validation)?;

    state
        .user_repository
        .update_password(user.id, &payload.new_password)
        .await
        .map_err(|e| {
            error!("Failed to update password: {}", e);
            AuthError::InternalServerError
        })?;

    Ok(Json(serde_json::json!({
        "message": "Password updated successfully"
    })))
}

/// Custom error type for authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many attempts")]
    TooManyRequests,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AuthError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AuthError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many sign-in attempts, try again later".to_string(),
            ),
            AuthError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AuthError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
