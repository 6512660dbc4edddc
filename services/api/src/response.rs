//! Uniform JSON envelope for successful responses
//!
//! Every endpoint answers with `{"success": true, ...}` on the happy
//! path; failures go through [`crate::error::ApiError`], which produces
//! the `success: false` counterpart.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 200 with a data payload
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data: Some(data),
        message: None,
    })
}

/// 201 with a data payload
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            message: None,
        }),
    )
}

/// 200 with a message and no payload
pub fn message(text: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        data: None,
        message: Some(text.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_envelope_omits_the_message_field() {
        let Json(body) = ok(vec![1, 2, 3]);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"][2], 3);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn message_envelope_omits_the_data_field() {
        let Json(body) = message("Discipline issue deleted successfully");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Discipline issue deleted successfully");
        assert!(value.get("data").is_none());
    }
}
