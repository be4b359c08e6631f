use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Wrapper for API responses that adds the success envelope:
/// `{statusCode, data, message, success: true}`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with a message
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, message, StatusCode::OK)
    }

    /// 201 Created with a message
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, message, StatusCode::CREATED)
    }

    pub fn with_status(data: T, message: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            data,
            message: message.into(),
            status_code,
        }
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({
            "statusCode": self.status_code.as_u16(),
            "data": serde_json::to_value(&self.data)?,
            "message": self.message,
            "success": self.status_code.as_u16() < 400
        }))
    }
}

/// `data: {}` for operations that have nothing to return
pub fn empty() -> Value {
    json!({})
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self.to_json() {
            Ok(envelope) => (self.status_code, Json(envelope)).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                crate::error::ApiError::internal_server_error("Failed to serialize response data").into_response()
            }
        }
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
