//! HTTP testing client and response utilities

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use crate::{TestError, TestResult};

/// In-process client over a fully built router
#[derive(Clone)]
pub struct TestClient {
    router: Router,
    auth_token: Option<String>,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            auth_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` on every request
    pub fn authenticated_with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn get(&self, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self, Method::GET, path.into())
    }

    pub fn post(&self, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self, Method::POST, path.into())
    }

    pub fn put(&self, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self, Method::PUT, path.into())
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self, Method::DELETE, path.into())
    }
}

/// Request builder for fluent API
pub struct RequestBuilder {
    router: Router,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<String>,
}

impl RequestBuilder {
    fn new(client: &TestClient, method: Method, path: String) -> Self {
        let mut headers = Vec::new();
        if let Some(token) = &client.auth_token {
            headers.push((header::AUTHORIZATION.to_string(), format!("Bearer {}", token)));
        }
        Self {
            router: client.router.clone(),
            method,
            path,
            headers,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Bearer token for this request only
    pub fn bearer(self, token: &str) -> Self {
        self.header(header::AUTHORIZATION.as_str(), format!("Bearer {}", token))
    }

    /// Set JSON body and content type
    pub fn json<T: serde::Serialize>(mut self, data: &T) -> Self {
        if let Ok(body) = serde_json::to_string(data) {
            self.body = Some(body);
            self.headers
                .push((header::CONTENT_TYPE.to_string(), "application/json".to_string()));
        }
        self
    }

    /// Raw body without a content type
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, query)
    }

    /// Send the request through the router
    pub async fn send(self) -> TestResult<TestResponse> {
        let mut request = Request::builder().method(self.method.clone()).uri(self.uri());
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let request = request
            .body(Body::from(self.body.unwrap_or_default()))
            .map_err(|e| TestError::Request(e.to_string()))?;

        let response = self
            .router
            .oneshot(request)
            .await
            .map_err(|e| TestError::Request(e.to_string()))?;

        let status_code = response.status().as_u16();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TestError::Request(e.to_string()))?
            .to_bytes();

        Ok(TestResponse {
            status_code,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Test response wrapper with assertion methods
#[derive(Debug, Clone)]
pub struct TestResponse {
    status_code: u16,
    body: String,
}

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.status_code
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn json(&self) -> TestResult<JsonValue> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// `data` of the envelope, `Null` when absent or unparseable
    pub fn data(&self) -> JsonValue {
        self.json()
            .ok()
            .and_then(|body| body.get("data").cloned())
            .unwrap_or(JsonValue::Null)
    }

    pub fn message(&self) -> String {
        self.json()
            .ok()
            .and_then(|body| body.get("message").and_then(JsonValue::as_str).map(String::from))
            .unwrap_or_default()
    }

    /// `errors` of an error envelope
    pub fn errors(&self) -> Vec<String> {
        self.json()
            .ok()
            .and_then(|body| body.get("errors").cloned())
            .and_then(|errors| serde_json::from_value(errors).ok())
            .unwrap_or_default()
    }

    /// Assert the response status code
    pub fn assert_status(self, expected_status: u16) -> Self {
        if self.status_code != expected_status {
            panic!(
                "Expected status {}, got {}: {}",
                expected_status, self.status_code, self.body
            );
        }
        self
    }

    /// Assert a 2xx status and `success: true`
    pub fn assert_success(self) -> Self {
        let success = self
            .json()
            .ok()
            .and_then(|body| body.get("success").and_then(JsonValue::as_bool));
        if !(200..300).contains(&self.status_code) || success != Some(true) {
            panic!("Expected successful response, got {}: {}", self.status_code, self.body);
        }
        self
    }

    pub fn assert_message(self, expected: &str) -> Self {
        let message = self.message();
        if message != expected {
            panic!("Expected message '{}', got '{}'", expected, message);
        }
        self
    }

    /// Assert JSON response contains specific fields/values
    pub fn assert_json_contains(self, expected: JsonValue) -> TestResult<Self> {
        let actual_json = self.json()?;
        if !json_contains(&actual_json, &expected) {
            return Err(TestError::Assertion {
                message: format!("Expected JSON to contain: {}, got: {}", expected, actual_json),
            });
        }
        Ok(self)
    }
}

/// Objects match when every expected key matches; arrays element-wise
fn json_contains(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Object(actual_obj), JsonValue::Object(expected_obj)) => {
            expected_obj.iter().all(|(key, expected_value)| {
                actual_obj
                    .get(key)
                    .map_or(false, |actual_value| json_contains(actual_value, expected_value))
            })
        }
        (JsonValue::Array(actual_arr), JsonValue::Array(expected_arr)) => {
            actual_arr.len() == expected_arr.len()
                && actual_arr
                    .iter()
                    .zip(expected_arr)
                    .all(|(a, e)| json_contains(a, e))
        }
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::json;

    fn router() -> Router {
        Router::new()
            .route(
                "/echo",
                post(|Json(body): Json<JsonValue>| async move {
                    Json(json!({"success": true, "message": "ok", "data": body}))
                }),
            )
            .route(
                "/whoami",
                get(|headers: axum::http::HeaderMap| async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    Json(json!({"success": true, "message": auth}))
                }),
            )
            .route(
                "/query",
                get(|axum::extract::RawQuery(q): axum::extract::RawQuery| async move {
                    Json(json!({"success": true, "message": q.unwrap_or_default()}))
                }),
            )
    }

    #[tokio::test]
    async fn test_json_round_trip_through_router() {
        let client = TestClient::new(router());
        let response = client
            .post("/echo")
            .json(&json!({"nombre": "Ana"}))
            .send()
            .await
            .unwrap()
            .assert_status(200)
            .assert_success()
            .assert_message("ok");

        assert_eq!(response.data()["nombre"], "Ana");
        assert!(response
            .assert_json_contains(json!({"data": {"nombre": "Ana"}}))
            .is_ok());
    }

    #[tokio::test]
    async fn test_token_is_sent() {
        let client = TestClient::new(router()).authenticated_with_token("abc");
        let response = client.get("/whoami").send().await.unwrap();
        assert_eq!(response.message(), "Bearer abc");
    }

    #[tokio::test]
    async fn test_query_is_encoded() {
        let client = TestClient::new(router());
        let response = client
            .get("/query")
            .query("fecha", "2026-03-10")
            .query("hora", "10:30")
            .send()
            .await
            .unwrap();
        assert_eq!(response.message(), "fecha=2026-03-10&hora=10%3A30");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let client = TestClient::new(router());
        let response = client.get("/missing").send().await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.data(), JsonValue::Null);
    }

    #[test]
    fn test_json_contains() {
        let actual = json!({"a": 1, "b": {"c": [1, 2]}, "d": "x"});
        assert!(json_contains(&actual, &json!({"b": {"c": [1, 2]}})));
        assert!(!json_contains(&actual, &json!({"a": 2})));
        assert!(!json_contains(&actual, &json!({"z": null})));
    }
}
