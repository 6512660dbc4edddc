//! Authentication middleware for JWT token validation
//!
//! Tokens are minted by the auth service; this service only verifies
//! them with the shared public key and resolves the caller into a
//! [`RequestContext`] before any handler runs.

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Role, permission::PermissionFlags},
    scope::RequestContext,
    state::AppState,
};

/// JWT claims structure, as issued by the auth service
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Human-readable user code
    pub user_code: String,
    /// Actor role
    pub role: Role,
    /// Assigned course, when the actor has one
    pub course_id: Option<Uuid>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Authenticated actor extracted from a verified token
#[derive(Debug, Clone)]
pub struct AuthActor {
    pub id: Uuid,
    pub user_code: String,
    pub role: Role,
    pub course_id: Option<Uuid>,
}

/// Verifies tokens against the auth service's public key
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a new verifier from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `JWT_PUBLIC_KEY`: public key for verifying tokens (PEM format) or path to a key file
    pub fn from_env() -> anyhow::Result<Self> {
        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY environment variable not set"))?;

        // The variable may hold the PEM inline or point at a key file
        // (tried from CWD, then from the project root).
        let public_key = if public_key.starts_with("-----BEGIN") {
            public_key
        } else {
            std::fs::read_to_string(&public_key)
                .or_else(|_| {
                    let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
                    path.push(&public_key);
                    std::fs::read_to_string(path)
                })
                .map_err(|e| anyhow::anyhow!("Failed to read public key file: {}", e))?
                .trim()
                .to_string()
        };

        let decoding_key = DecodingKey::from_rsa_pem(public_key.as_bytes())?;
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtVerifier {
            decoding_key,
            validation,
        })
    }

    /// Validate a token and return the claims
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let token_data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Authentication middleware
///
/// Verifies the bearer token, loads the admin capability flags when the
/// caller is an admin, and stores the resolved [`RequestContext`] in the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state
        .jwt_verifier
        .verify(bearer.token())
        .map_err(|_| ApiError::Unauthorized)?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized);
    }

    let actor = AuthActor {
        id: claims.sub,
        user_code: claims.user_code,
        role: claims.role,
        course_id: claims.course_id,
    };

    // Flags only exist for admins; everyone else carries the defaults.
    let permissions = if actor.role == Role::Admin {
        state
            .permission_repository
            .get(actor.id)
            .await
            .map_err(|e| {
                error!("Failed to load permissions for {}: {}", actor.id, e);
                ApiError::Internal("Failed to load permissions".to_string())
            })?
            .unwrap_or_default()
    } else {
        PermissionFlags::default()
    };

    req.extensions_mut()
        .insert(RequestContext::new(actor, permissions));

    Ok(next.run(req).await)
}
