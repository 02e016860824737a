//! Authentication and authorization error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication and authorization errors
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// No bearer token on the request
    #[error("Missing bearer token")]
    MissingToken,

    /// Token is malformed, expired, badly signed or revoked
    #[error("Token error: {message}")]
    TokenError { message: String },

    /// Email/password pair does not match an active user
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated user lacks the role for the resource
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    /// Configuration errors
    #[error("Authentication configuration error: {message}")]
    ConfigurationError { message: String },

    /// Hashing or signing failed
    #[error("Cryptographic error: {message}")]
    CryptographicError { message: String },
}

impl AuthError {
    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::TokenError { .. } => "TOKEN_ERROR",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::AccessDenied { .. } => "ACCESS_DENIED",
            AuthError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            AuthError::CryptographicError { .. } => "CRYPTOGRAPHIC_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingToken | AuthError::InvalidCredentials => 401,
            AuthError::TokenError { .. } | AuthError::AccessDenied { .. } => 403,
            AuthError::ConfigurationError { .. } | AuthError::CryptographicError { .. } => 500,
        }
    }

    /// Message shown to API clients
    pub fn public_message(&self) -> String {
        match self {
            AuthError::MissingToken => "Token de acceso requerido".to_string(),
            AuthError::TokenError { .. } => "Token inválido".to_string(),
            AuthError::InvalidCredentials => "Credenciales inválidas".to_string(),
            AuthError::AccessDenied { message } => message.clone(),
            AuthError::ConfigurationError { .. } | AuthError::CryptographicError { .. } => {
                "Error interno del servidor".to_string()
            }
        }
    }

    /// Create a token error
    pub fn token_error(message: impl Into<String>) -> Self {
        AuthError::TokenError {
            message: message.into(),
        }
    }

    /// Create an access denied error
    pub fn access_denied(message: impl Into<String>) -> Self {
        AuthError::AccessDenied {
            message: message.into(),
        }
    }

    /// Role not in the allowed set
    pub fn insufficient_role() -> Self {
        Self::access_denied("No tienes permisos para acceder a este recurso")
    }

    /// Create a configuration error
    pub fn configuration_error(message: impl Into<String>) -> Self {
        AuthError::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a cryptographic error
    pub fn crypto_error(message: impl Into<String>) -> Self {
        AuthError::CryptographicError {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::token_error(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::crypto_error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::MissingToken.error_code(), "MISSING_TOKEN");
        assert_eq!(AuthError::token_error("expired").error_code(), "TOKEN_ERROR");
        assert_eq!(AuthError::insufficient_role().error_code(), "ACCESS_DENIED");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingToken.status_code(), 401);
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::token_error("bad signature").status_code(), 403);
        assert_eq!(AuthError::insufficient_role().status_code(), 403);
        assert_eq!(AuthError::crypto_error("cost").status_code(), 500);
    }

    #[test]
    fn test_public_messages() {
        assert_eq!(AuthError::MissingToken.public_message(), "Token de acceso requerido");
        assert_eq!(
            AuthError::token_error("ExpiredSignature").public_message(),
            "Token inválido"
        );
        assert_eq!(
            AuthError::insufficient_role().public_message(),
            "No tienes permisos para acceder a este recurso"
        );
        assert_eq!(
            AuthError::crypto_error("boom").public_message(),
            "Error interno del servidor"
        );
    }

    #[test]
    fn test_error_display() {
        let error = AuthError::token_error("Invalid signature");
        assert_eq!(error.to_string(), "Token error: Invalid signature");
    }
}
