//! Route table. Each role group lives in its own module and is nested under
//! `/api/v1`; [`build_router`] adds the shared tower layers.

mod admin;
mod auth;
mod enfermera_jefe;
mod instrumentador;
mod suministros;

use std::time::Duration;

use axum::http::{header, Method};
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use quirofano_http::HttpError;
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{authenticate, guard, require_roles};
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Require a valid session and one of `roles` on every route of `router`
fn protected(router: Router<AppState>, state: &AppState, roles: &[&'static str]) -> Router<AppState> {
    router
        .route_layer(from_fn_with_state(guard(roles), require_roles))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "¡API del Sistema de Gestión Hospitalaria funcionando correctamente!",
        "version": quirofano_core::version(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "message": "ok" }))
}

async fn not_found() -> HttpError {
    HttpError::not_found("Ruta no encontrada")
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

pub fn api_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/admin", admin::router(state))
        .nest("/enfermera_jefe", enfermera_jefe::router(state))
        .nest("/suministros", suministros::router(state))
        .nest("/instrumentador", instrumentador::router(state))
}

/// The whole application with its middleware stack
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_router(&state))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
