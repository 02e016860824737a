//! Bearer extraction and role guards

use crate::{AuthError, AuthResult, Claims};

const TOKEN_PREFIX: &str = "Bearer ";

/// Pull the token out of an `Authorization` header.
///
/// A missing header or an empty token is [`AuthError::MissingToken`]; any
/// other scheme is a token error.
pub fn extract_bearer(auth_header: Option<&str>) -> AuthResult<String> {
    let header_value = match auth_header {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(AuthError::MissingToken),
    };

    let token = header_value
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| AuthError::token_error(format!("Token must start with '{}'", TOKEN_PREFIX)))?
        .trim();

    if token.is_empty() {
        Err(AuthError::MissingToken)
    } else {
        Ok(token.to_string())
    }
}

/// The caller behind a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: i32,
    pub email: String,
    pub rol: String,
    /// Session key (`jti`)
    pub session_id: String,
}

impl UserContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.rol == role
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }
}

impl From<Claims> for UserContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            rol: claims.rol,
            session_id: claims.jti,
        }
    }
}

/// Required authentication guard with an optional role set
#[derive(Debug, Clone, Default)]
pub struct RequireAuth {
    required_roles: Vec<&'static str>,
}

impl RequireAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_role(mut self, role: &'static str) -> Self {
        self.required_roles.push(role);
        self
    }

    /// Any of `roles` grants access
    pub fn require_roles(mut self, roles: &[&'static str]) -> Self {
        self.required_roles.extend_from_slice(roles);
        self
    }

    pub fn required_roles(&self) -> &[&'static str] {
        &self.required_roles
    }

    pub fn validate_user(&self, user: &UserContext) -> AuthResult<()> {
        if self.required_roles.is_empty() || user.has_any_role(&self.required_roles) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = user.user_id,
                rol = %user.rol,
                "Role not allowed for resource"
            );
            Err(AuthError::insufficient_role())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(rol: &str) -> UserContext {
        UserContext {
            user_id: 3,
            email: "user@hospital.com".to_string(),
            rol: rol.to_string(),
            session_id: "jti".to_string(),
        }
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(extract_bearer(Some("Bearer   abc ")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(extract_bearer(None), Err(AuthError::MissingToken));
        assert_eq!(extract_bearer(Some("")), Err(AuthError::MissingToken));
        assert_eq!(extract_bearer(Some("Bearer ")), Err(AuthError::MissingToken));
    }

    #[test]
    fn test_wrong_scheme_is_invalid() {
        let err = extract_bearer(Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_role_guard() {
        let guard = RequireAuth::new().require_roles(&["central", "administrador"]);

        assert!(guard.validate_user(&user("central")).is_ok());
        assert!(guard.validate_user(&user("administrador")).is_ok());
        assert_eq!(
            guard.validate_user(&user("farmacia")),
            Err(AuthError::insufficient_role())
        );
    }

    #[test]
    fn test_guard_without_roles_accepts_any_user() {
        assert!(RequireAuth::new().validate_user(&user("farmacia")).is_ok());
    }

    #[test]
    fn test_context_from_claims() {
        let claims = Claims {
            sub: 9,
            email: "x@hospital.com".to_string(),
            rol: "instrumentador".to_string(),
            jti: "abc".to_string(),
            iat: 0,
            exp: 1,
        };
        let ctx = UserContext::from(claims);
        assert_eq!(ctx.user_id, 9);
        assert_eq!(ctx.session_id, "abc");
        assert!(ctx.has_role("instrumentador"));
    }
}
