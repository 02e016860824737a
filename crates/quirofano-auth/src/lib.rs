//! # quirofano-auth
//!
//! Bearer tokens, password hashing and role checks for the quirófano API.
//! Nothing here touches storage: session revocation is checked by the caller
//! with the `jti` carried in [`Claims`].

pub mod error;
pub mod guards;
pub mod jwt;
pub mod password;

pub use error::AuthError;
pub use guards::{extract_bearer, RequireAuth, UserContext};
pub use jwt::{Claims, IssuedToken, JwtConfig, JwtProvider};
pub use password::{BcryptHasher, PasswordHasher};

/// Authentication result type alias
pub type AuthResult<T> = Result<T, AuthError>;
