use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Success envelope shared by every endpoint:
/// `{"success": true, "message": ..., "data": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: Option<T>,
    pub status_code: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            status_code: StatusCode::CREATED,
        }
    }

}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match self.data {
            None => None,
            Some(data) => match serde_json::to_value(&data) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "message": "failed to serialize response data"
                        })),
                    )
                        .into_response();
                }
            },
        };

        let mut envelope = json!({
            "success": true,
            "message": self.message,
        });
        if let Some(data) = data_value {
            envelope["data"] = data;
        }

        (self.status_code, Json(envelope)).into_response()
    }
}

/// Handler result alias: success envelope or ApiError
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
