//! Bearer authentication and role gates for the route groups.
//!
//! [`authenticate`] verifies the token, checks that its session is still
//! active and stores the [`UserContext`] in the request extensions.
//! [`require_roles`] runs after it and answers 403 for roles outside the
//! group. Handlers read the caller through [`CurrentUser`].

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use quirofano_auth::{extract_bearer, AuthError, RequireAuth, UserContext};
use quirofano_http::{HttpError, HttpResult};
use quirofano_orm::models::Role;

use crate::state::AppState;

pub const ADMIN_ROLES: &[&str] = &[Role::ADMINISTRADOR];
pub const HEAD_NURSE_ROLES: &[&str] = &[Role::ENFERMERA_JEFE, Role::ADMINISTRADOR];
pub const SUPPLY_ROLES: &[&str] = &[Role::CENTRAL, Role::FARMACIA, Role::ADMINISTRADOR];
pub const CENTRAL_ROLES: &[&str] = &[Role::CENTRAL, Role::ADMINISTRADOR];
pub const INSTRUMENTATION_ROLES: &[&str] =
    &[Role::INSTRUMENTADOR, Role::ENFERMERA_JEFE, Role::ADMINISTRADOR];

pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> HttpResult<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = extract_bearer(header)?;
    let claims = state.jwt.verify(&token)?;

    let active = state
        .store()
        .find_session(&claims.jti)
        .await?
        .map_or(false, |sesion| sesion.is_valid_at(Utc::now()));
    if !active {
        tracing::debug!(user_id = claims.sub, "Rejected token for an inactive session");
        return Err(AuthError::token_error("session is no longer active").into());
    }

    request.extensions_mut().insert(UserContext::from(claims));
    Ok(next.run(request).await)
}

/// Gate for a route group; runs after [`authenticate`]
pub async fn require_roles(
    State(guard): State<RequireAuth>,
    request: Request,
    next: Next,
) -> HttpResult<Response> {
    let user = request
        .extensions()
        .get::<UserContext>()
        .ok_or(AuthError::MissingToken)?;
    guard.validate_user(user)?;
    Ok(next.run(request).await)
}

pub fn guard(roles: &[&'static str]) -> RequireAuth {
    RequireAuth::new().require_roles(roles)
}

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}
