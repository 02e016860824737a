//! Success envelope

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// `{"success": true, "message": ..., "data": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T = Value> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    /// 201 with data
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ApiResponse<Value> {
    /// 200 without data
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn render<T: Serialize>(response: ApiResponse<T>) -> (StatusCode, Value) {
        let response = response.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_ok_envelope() {
        let (status, body) = render(ApiResponse::ok("Roles obtenidos exitosamente", json!([1]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "message": "Roles obtenidos exitosamente", "data": [1]})
        );
    }

    #[tokio::test]
    async fn test_created_status() {
        let (status, body) = render(ApiResponse::created("Creado", json!({"id": 1}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["id"], 1);
    }

    #[tokio::test]
    async fn test_message_only_omits_data() {
        let (status, body) = render(ApiResponse::message("Sesión cerrada exitosamente")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("data").is_none());
        assert_eq!(body["success"], true);
    }
}
