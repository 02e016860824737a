//! Request extractors that reject in the API envelope
//!
//! Bodies are taken as raw JSON first so presence rules can run and report
//! every failure before the typed deserialization happens.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use quirofano_validation::Rules;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HttpError;

const INVALID_DATA: &str = "Datos inválidos";

/// A JSON request body as an untyped value
#[derive(Debug, Clone)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(HttpError::bad_request_with(
                INVALID_DATA,
                vec![rejection.body_text()],
            )),
        }
    }
}

/// A JSON body that may be absent; an empty body reads as `{}`
#[derive(Debug, Clone)]
pub struct OptionalJsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for OptionalJsonBody
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| HttpError::bad_request_with(INVALID_DATA, vec![e.body_text()]))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJsonBody(Value::Object(Default::default())));
        }
        serde_json::from_slice(&bytes)
            .map(OptionalJsonBody)
            .map_err(|e| HttpError::bad_request_with(INVALID_DATA, vec![e.to_string()]))
    }
}

/// Query string deserialized into `T`
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(HttpError::bad_request_with(
                "Parámetros inválidos",
                vec![rejection.body_text()],
            )),
        }
    }
}

/// Deserialize a body into `T`; type mismatches are a 400
pub fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, HttpError> {
    serde_json::from_value(body)
        .map_err(|e| HttpError::bad_request_with(INVALID_DATA, vec![e.to_string()]))
}

/// Run `rules` against `body`, then deserialize it.
///
/// Rule failures answer with `message` and one entry per failed rule.
pub async fn validate_body<T: DeserializeOwned>(
    body: Value,
    rules: &Rules,
    message: &str,
) -> Result<T, HttpError> {
    rules
        .validate(&body)
        .await
        .map_err(|errors| HttpError::validation(message, errors))?;
    parse_body(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;
    use http_body_util::BodyExt;
    use quirofano_validation::RequiredValidator;
    use serde::Deserialize;
    use serde_json::json;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Login {
        email: String,
    }

    fn app() -> Router {
        Router::new()
            .route("/strict", post(|JsonBody(body): JsonBody| async move { axum::Json(body) }))
            .route(
                "/optional",
                post(|OptionalJsonBody(body): OptionalJsonBody| async move { axum::Json(body) }),
            )
    }

    async fn call(uri: &str, body: &'static str, json_type: bool) -> (StatusCode, Value) {
        let mut request = axum::http::Request::post(uri);
        if json_type {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let response = app()
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = call("/strict", "{\"email\": ", true).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Datos inválidos");
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_optional_body_defaults_to_empty_object() {
        let (status, body) = call("/optional", "", false).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let (_, body) = call("/optional", "{\"motivo\": \"fiebre\"}", false).await;
        assert_eq!(body["motivo"], "fiebre");
    }

    #[tokio::test]
    async fn test_validate_body_runs_rules_before_types() {
        let rules = Rules::new().field("email", RequiredValidator::with_message("Email requerido"));

        let err = validate_body::<Login>(json!({}), &rules, "Datos de login inválidos")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            HttpError::bad_request_with("Datos de login inválidos", vec!["Email requerido".to_string()])
        );

        let err = validate_body::<Login>(json!({"email": 5}), &rules, "x").await.unwrap_err();
        assert_eq!(err.public_message(), "Datos inválidos");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let ok: Login = validate_body(json!({"email": "a@b.co"}), &rules, "x").await.unwrap();
        assert_eq!(ok.email, "a@b.co");
    }
}
