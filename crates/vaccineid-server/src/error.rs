//! Server error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use vaccineid_core::ValidationError;
use vaccineid_store::StoreError;

/// Request failure mapped to an HTTP response
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed or unverifiable bearer token
    #[error("Not Authorized")]
    Unauthorized,

    /// Valid token without the required scope
    #[error("Forbidden")]
    Forbidden,

    /// Invalid request parameters
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Addressed patient does not exist
    #[error("{0}")]
    NotFound(&'static str),

    /// Patient profile already exists
    #[error("Patient Profile Exists")]
    Conflict,

    /// Store failure; the cause is logged, never returned
    #[error("Internal Server Error")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(ApiError::Unauthorized.to_string(), "Not Authorized");
        assert_eq!(ApiError::Forbidden.to_string(), "Forbidden");
        assert_eq!(ApiError::Conflict.to_string(), "Patient Profile Exists");
        assert_eq!(
            ApiError::NotFound("Patient Not Found").to_string(),
            "Patient Not Found"
        );
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err: ApiError = ValidationError::MissingField("dob".to_string()).into();
        assert_eq!(err.to_string(), "Bad Request - Missing Required Parameter - dob");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_is_not_leaked() {
        let err: ApiError = StoreError::Status {
            status: 503,
            message: "account key rotated".to_string(),
        }
        .into();

        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Not Found").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let (status, body) = body_json(ApiError::Conflict).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Patient Profile Exists");
        assert_eq!(body["status"], 409);
    }

    #[tokio::test]
    async fn test_into_response_store_error() {
        let (status, body) = body_json(StoreError::Credential("expired".to_string()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(body["status"], 500);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
