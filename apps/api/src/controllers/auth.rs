//! Registration, login, profile and logout.

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use quirofano_auth::AuthError;
use quirofano_http::{validate_body, ApiResponse, HttpError, HttpResult, JsonBody};
use quirofano_orm::models::{NuevaSesion, NuevoUsuario, Role, Usuario};
use quirofano_validation::{
    EmailValidator, LengthValidator, NumericValidator, RequiredValidator, Rules,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub password: String,
    pub cedula: String,
    pub telefono: Option<String>,
    pub rol_id: i32,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

pub fn registration_rules() -> Rules {
    Rules::new()
        .field("nombre", RequiredValidator::with_message("El nombre es requerido"))
        .field("apellido", RequiredValidator::with_message("El apellido es requerido"))
        .field("email", EmailValidator::new().message("Email válido es requerido"))
        .field(
            "password",
            LengthValidator::new()
                .min(6)
                .message("La contraseña debe tener al menos 6 caracteres"),
        )
        .field("cedula", RequiredValidator::with_message("La cédula es requerida"))
        .field(
            "rol_id",
            NumericValidator::positive_id().message("El ID del rol es requerido y debe ser un número"),
        )
}

fn login_rules() -> Rules {
    Rules::new()
        .field("email", EmailValidator::new().message("Email válido es requerido"))
        .field("password", RequiredValidator::with_message("La contraseña es requerida"))
}

/// bcrypt runs on the blocking pool
pub async fn hash_password(state: &AppState, password: &str) -> HttpResult<String> {
    let hasher = state.hasher.clone();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hasher.hash_password(&password))
        .await
        .map_err(|e| HttpError::internal(format!("password hashing task failed: {}", e)))?
        .map_err(HttpError::from)
}

async fn verify_password(state: &AppState, password: &str, hash: &str) -> HttpResult<bool> {
    let hasher = state.hasher.clone();
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
        .await
        .map_err(|e| HttpError::internal(format!("password check task failed: {}", e)))?
        .map_err(HttpError::from)
}

/// Create an account after the uniqueness and role checks
pub async fn create_account(state: &AppState, req: RegisterRequest) -> HttpResult<(Usuario, Role)> {
    let store = state.store();
    if store.email_taken(&req.email, None).await? {
        return Err(HttpError::conflict("El email ya está registrado"));
    }
    if store.cedula_taken(&req.cedula, None).await? {
        return Err(HttpError::conflict("La cédula ya está registrada"));
    }
    let rol = store
        .find_role(req.rol_id)
        .await?
        .ok_or_else(|| HttpError::bad_request("El rol especificado no existe"))?;

    let password_hash = hash_password(state, &req.password).await?;
    let usuario = store
        .create_user(NuevoUsuario {
            nombre: req.nombre,
            apellido: req.apellido,
            email: req.email,
            password_hash,
            cedula: req.cedula,
            telefono: req.telefono,
            rol_id: rol.id,
            activo: true,
        })
        .await?;

    tracing::info!(user_id = usuario.id, rol = %rol.nombre, "User registered");
    Ok((usuario, rol))
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

/// Sign a token and record its session
async fn open_session(
    state: &AppState,
    usuario: &Usuario,
    rol: &str,
    headers: &HeaderMap,
) -> HttpResult<String> {
    let issued = state.jwt.issue(usuario.id, &usuario.email, rol)?;
    state
        .store()
        .create_session(NuevaSesion {
            usuario_id: usuario.id,
            token_sesion: issued.claims.jti.clone(),
            fecha_expiracion: issued.claims.expires_at(),
            ip_address: header_text(headers, "x-forwarded-for"),
            user_agent: header_text(headers, USER_AGENT.as_str()),
        })
        .await?;
    Ok(issued.token)
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: RegisterRequest =
        validate_body(body, &registration_rules(), "Datos de registro inválidos").await?;
    let (usuario, rol) = create_account(&state, req).await?;
    let token = open_session(&state, &usuario, &rol.nombre, &headers).await?;

    let mut user = views::to_json(&usuario)?;
    user["rol"] = views::to_json(&rol)?;
    Ok(ApiResponse::created(
        "Usuario registrado exitosamente",
        json!({ "user": user, "token": token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody,
) -> HttpResult<ApiResponse> {
    let req: LoginRequest = validate_body(body, &login_rules(), "Datos de login inválidos").await?;
    let store = state.store();

    let usuario = match store.find_user_by_email(&req.email).await? {
        Some(usuario) if usuario.activo && usuario.deleted_at.is_none() => usuario,
        _ => return Err(AuthError::InvalidCredentials.into()),
    };
    if !verify_password(&state, &req.password, &usuario.password_hash).await? {
        tracing::warn!(user_id = usuario.id, "Failed login attempt");
        return Err(AuthError::InvalidCredentials.into());
    }

    let rol = store
        .find_role(usuario.rol_id)
        .await?
        .ok_or_else(|| HttpError::internal(format!("user {} has no role", usuario.id)))?;
    let token = open_session(&state, &usuario, &rol.nombre, &headers).await?;

    tracing::info!(user_id = usuario.id, "User logged in");
    Ok(ApiResponse::ok(
        "Login exitoso",
        json!({ "user": views::user_with_role(store, &usuario).await?, "token": token }),
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<ApiResponse> {
    let store = state.store();
    let usuario = store
        .find_user(user.user_id)
        .await?
        .ok_or_else(|| HttpError::not_found("Usuario no encontrado"))?;
    Ok(ApiResponse::ok(
        "Perfil obtenido exitosamente",
        json!({ "user": views::user_with_role(store, &usuario).await? }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> HttpResult<ApiResponse<Value>> {
    state.store().deactivate_session(&user.session_id).await?;
    tracing::info!(user_id = user.user_id, "User logged out");
    Ok(ApiResponse::message("Sesión cerrada exitosamente"))
}
