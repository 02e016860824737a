//! HS256 token issue and verification

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuthError, AuthResult};

/// Signing configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expires_in_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            expires_in_hours,
        }
    }
}

/// Claims carried by every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i32,
    pub email: String,
    /// Role name
    pub rol: String,
    /// Session key in `sesiones_usuario`
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A freshly signed token and the claims inside it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct JwtProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for JwtProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtProvider")
            .field("lifetime_hours", &self.lifetime.num_hours())
            .finish()
    }
}

impl JwtProvider {
    pub fn new(config: &JwtConfig) -> AuthResult<Self> {
        if config.secret.is_empty() {
            return Err(AuthError::configuration_error("JWT secret cannot be empty"));
        }
        if config.expires_in_hours <= 0 {
            return Err(AuthError::configuration_error(
                "Token lifetime must be positive",
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            lifetime: Duration::hours(config.expires_in_hours),
        })
    }

    /// Sign a token for `user_id` with a fresh `jti`
    pub fn issue(&self, user_id: i32, email: &str, rol: &str) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            rol: rol.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        let token = self.sign(&claims)?;
        tracing::debug!(user_id, jti = %claims.jti, "Token issued");
        Ok(IssuedToken { token, claims })
    }

    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::crypto_error(e.to_string()))
    }

    /// Check signature and expiry; any failure is a token error
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
