//! JWT service for token generation, validation, and management
//!
//! This module provides functionality for creating and validating JWT tokens
//! using the RS256 algorithm, as well as refresh token rotation and
//! token blacklisting using Redis.

use anyhow::Result;
use common::cache::RedisPool;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::{Role, User};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens
    pub private_key: String,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("JWT_PRIVATE_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PRIVATE_KEY environment variable not set"))?;
        let private_key = load_pem(&private_key, "private key")?;

        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY environment variable not set"))?;
        let public_key = load_pem(&public_key, "public key")?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        Ok(JwtConfig {
            private_key,
            public_key,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Resolve a PEM value that may be inline or a file path (tried from CWD,
/// then from the project root)
fn load_pem(value: &str, what: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    std::fs::read_to_string(value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(value);
            std::fs::read_to_string(path)
        })
        .map(|s| s.trim().to_string())
        .map_err(|e| anyhow::anyhow!("Failed to read {} file: {}", what, e))
}

/// JWT claims structure
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

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user.id,
            user_code: user.user_code.clone(),
            role: user.role,
            course_id: user.course_id,
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        let now = unix_now()?;

        let claims = Claims {
            sub: user.id,
            user_code: user.user_code.clone(),
            role: user.role,
            course_id: user.course_id,
            iat: now,
            exp: now + self.config.refresh_token_expiry,
            token_type: TokenType::Refresh,
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Check if a token is blacklisted in Redis
    pub async fn is_token_blacklisted(&self, redis_pool: &RedisPool, token: &str) -> Result<bool> {
        let key = format!("blacklisted_token:{}", token);
        let result = redis_pool.get(&key).await?;
        Ok(result.is_some())
    }

    /// Blacklist a token in Redis
    pub async fn blacklist_token(
        &self,
        redis_pool: &RedisPool,
        token: &str,
        expiry: u64,
    ) -> Result<()> {
        let key = format!("blacklisted_token:{}", token);
        redis_pool.set(&key, "1", Some(expiry)).await?;
        Ok(())
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    /// Rotate a refresh token
    ///
    /// Blacklists the old refresh token for its remaining lifetime and
    /// generates a new one.
    pub async fn rotate_refresh_token(
        &self,
        redis_pool: &RedisPool,
        user: &User,
        old_refresh_token: &str,
    ) -> Result<String> {
        let claims = self.validate_token(old_refresh_token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("Token is not a refresh token"));
        }

        if claims.sub != user.id {
            return Err(anyhow::anyhow!("Token does not belong to user"));
        }

        let now = unix_now()?;
        let expiry = claims.exp.saturating_sub(now);
        self.blacklist_token(redis_pool, old_refresh_token, expiry)
            .await?;

        let new_refresh_token = self.generate_refresh_token(user)?;

        Ok(new_refresh_token)
    }
}

fn unix_now() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs();
    Ok(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercising encode/decode would require generating real RSA keys, so
    // the tests pin down the claims wire shape the api service depends on.

    #[test]
    fn test_claims_wire_shape() {
        let claims = Claims {
            sub: Uuid::nil(),
            user_code: "ADM-001".to_string(),
            role: Role::Admin,
            course_id: None,
            iat: 1,
            exp: 2,
            token_type: TokenType::Access,
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["user_code"], "ADM-001");
        assert!(json["course_id"].is_null());
        assert_eq!(json["token_type"], "Access");
    }

    #[test]
    fn test_claims_parse_with_course() {
        let course = Uuid::new_v4();
        let json = format!(
            r#"{{"sub":"{}","user_code":"INS-004","role":"instructor","course_id":"{}","iat":1,"exp":2,"token_type":"Refresh"}}"#,
            Uuid::nil(),
            course
        );

        let claims: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims.role, Role::Instructor);
        assert_eq!(claims.course_id, Some(course));
        assert_eq!(claims.token_type, TokenType::Refresh);
    }
}
