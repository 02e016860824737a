//! Handler-boundary error type
//!
//! Every handler returns `HttpResult<T>`. Domain errors from the store and
//! the auth layer convert with `?`; anything unexpected becomes a 500 whose
//! detail goes to the log, never to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quirofano_auth::AuthError;
use quirofano_orm::ModelError;
use quirofano_validation::ValidationErrors;
use serde_json::json;
use thiserror::Error;

/// Result type for handlers
pub type HttpResult<T> = Result<T, HttpError>;

const INTERNAL_MESSAGE: &str = "Error interno del servidor";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("{message}")]
    BadRequest {
        message: String,
        errors: Vec<String>,
    },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl HttpError {
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        HttpError::BadRequest {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// 400 with an `errors` list
    pub fn bad_request_with<T: Into<String>>(message: T, errors: Vec<String>) -> Self {
        HttpError::BadRequest {
            message: message.into(),
            errors,
        }
    }

    /// 400 carrying each failed rule's message
    pub fn validation<T: Into<String>>(message: T, errors: ValidationErrors) -> Self {
        Self::bad_request_with(message, errors.messages())
    }

    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        HttpError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn forbidden<T: Into<String>>(message: T) -> Self {
        HttpError::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found<T: Into<String>>(message: T) -> Self {
        HttpError::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict<T: Into<String>>(message: T) -> Self {
        HttpError::Conflict {
            message: message.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        HttpError::Internal {
            message: message.into(),
        }
    }

    /// Get error code for consistent API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpError::BadRequest { .. } => "BAD_REQUEST",
            HttpError::Unauthorized { .. } => "UNAUTHORIZED",
            HttpError::Forbidden { .. } => "FORBIDDEN",
            HttpError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            HttpError::Conflict { .. } => "RESOURCE_CONFLICT",
            HttpError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            HttpError::Forbidden { .. } => StatusCode::FORBIDDEN,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::Conflict { .. } => StatusCode::CONFLICT,
            HttpError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client
    pub fn public_message(&self) -> &str {
        match self {
            HttpError::BadRequest { message, .. }
            | HttpError::Unauthorized { message }
            | HttpError::Forbidden { message }
            | HttpError::NotFound { message }
            | HttpError::Conflict { message } => message,
            HttpError::Internal { .. } => INTERNAL_MESSAGE,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let HttpError::Internal { message } = &self {
            tracing::error!(error = %message, "Unhandled error while processing request");
        }

        let mut body = json!({
            "success": false,
            "message": self.public_message(),
        });
        if let HttpError::BadRequest { errors, .. } = &self {
            if !errors.is_empty() {
                body["errors"] = json!(errors);
            }
        }

        (status, Json(body)).into_response()
    }
}

impl From<ModelError> for HttpError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound(_) => HttpError::not_found("Recurso no encontrado"),
            ModelError::Conflict(constraint) => {
                tracing::debug!(constraint = %constraint, "Unique constraint violated");
                HttpError::conflict("El registro ya existe")
            }
            ModelError::Validation(message) => HttpError::bad_request(message),
            ModelError::RoomUnavailable => {
                HttpError::conflict("El quirófano no está disponible en el horario solicitado")
            }
            ModelError::InsufficientStock { item_id } => {
                HttpError::bad_request(format!("Stock insuficiente para el item {}", item_id))
            }
            ModelError::StaleState { .. } => {
                HttpError::conflict("La cirugía fue modificada por otra solicitud")
            }
            other => HttpError::internal(other.to_string()),
        }
    }
}

impl From<AuthError> for HttpError {
    fn from(err: AuthError) -> Self {
        match err.status_code() {
            401 => HttpError::unauthorized(err.public_message()),
            403 => HttpError::forbidden(err.public_message()),
            _ => HttpError::internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::internal(format!("JSON serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use quirofano_validation::ValidationError;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(HttpError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(HttpError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(HttpError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(HttpError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(HttpError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            HttpError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(HttpError::bad_request("x").error_code(), "BAD_REQUEST");
        assert_eq!(HttpError::conflict("x").error_code(), "RESOURCE_CONFLICT");
    }

    #[test]
    fn test_model_error_mapping() {
        assert_eq!(
            HttpError::from(ModelError::NotFound("cirugias".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(ModelError::Conflict("items_codigo_key".to_string())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            HttpError::from(ModelError::InsufficientStock { item_id: 4 }),
            HttpError::bad_request("Stock insuficiente para el item 4")
        );
        assert_eq!(
            HttpError::from(ModelError::StaleState { cirugia_id: 1 }).status_code(),
            StatusCode::CONFLICT
        );
        assert!(matches!(
            HttpError::from(ModelError::Database("timeout".to_string())),
            HttpError::Internal { .. }
        ));
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            HttpError::from(AuthError::MissingToken),
            HttpError::unauthorized("Token de acceso requerido")
        );
        assert_eq!(
            HttpError::from(AuthError::token_error("expired")),
            HttpError::forbidden("Token inválido")
        );
        assert!(matches!(
            HttpError::from(AuthError::crypto_error("cost")),
            HttpError::Internal { .. }
        ));
    }

    #[tokio::test]
    async fn test_validation_envelope() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::new("nombre", "El nombre es requerido"));
        errors.add(ValidationError::new("cedula", "La cédula es requerida"));

        let response = HttpError::validation("Datos de registro inválidos", errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Datos de registro inválidos");
        assert_eq!(
            body["errors"],
            json!(["El nombre es requerido", "La cédula es requerida"])
        );
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response = HttpError::internal("connection refused on 10.0.0.5").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Error interno del servidor");
        assert!(body.get("errors").is_none());
    }
}
