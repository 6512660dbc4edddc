//! Custom error types for the API service

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::authz::Deny;

/// Field-keyed validation messages
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("Unauthenticated")]
    Unauthorized,

    /// Refused by the authorization gate
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Payload failed validation
    #[error("Validation failed")]
    Validation(ValidationErrors),

    /// Request conflicts with the current state of the record
    #[error("{0}")]
    Conflict(String),

    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// 404 with the conventional "<subject> not found" message
    pub fn not_found(subject: &str) -> Self {
        ApiError::NotFound(format!("{} not found", subject))
    }
}

impl From<Deny> for ApiError {
    fn from(deny: Deny) -> Self {
        ApiError::Forbidden(deny.reason)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthenticated".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Conflict(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let body = match errors {
            Some(errors) => json!({
                "success": false,
                "message": message,
                "errors": errors,
            }),
            None => json!({
                "success": false,
                "message": message,
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_accumulate_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "The title field is required");
        errors.add("title", "The title may not be greater than 255 characters");
        errors.add("severity", "The selected severity is invalid");

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["title"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["severity"][0],
            "The selected severity is invalid"
        );
    }

    #[test]
    fn single_builds_a_one_field_map() {
        let errors = ValidationErrors::single("course_id", "The course_id field is required");
        assert!(!errors.is_empty());
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["course_id"][0], "The course_id field is required");
    }
}
