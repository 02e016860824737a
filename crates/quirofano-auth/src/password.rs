//! Password hashing

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::{AuthError, AuthResult};

/// Password hasher trait for different hashing algorithms
pub trait PasswordHasher: Send + Sync {
    /// Hash a password
    fn hash_password(&self, password: &str) -> AuthResult<String>;

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool>;

    /// Get the hasher name
    fn hasher_name(&self) -> &str;
}

/// bcrypt password hasher implementation
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Create a new bcrypt hasher with custom cost
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Cost used by the login flow in production
    pub fn production() -> Self {
        Self { cost: 12 }
    }

    /// Cheap cost for tests and demos
    pub fn development() -> Self {
        Self { cost: 4 }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        hash(password, self.cost).map_err(AuthError::from)
    }

    // A hash that does not parse counts as a mismatch
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<bool> {
        match verify(password, hash) {
            Ok(matches) => Ok(matches),
            Err(bcrypt::BcryptError::InvalidHash(_)) | Err(bcrypt::BcryptError::InvalidPrefix(_)) => {
                Ok(false)
            }
            Err(e) => Err(AuthError::from(e)),
        }
    }

    fn hasher_name(&self) -> &str {
        "bcrypt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = BcryptHasher::development();
        let hashed = hasher.hash_password("1234").unwrap();

        assert_ne!(hashed, "1234");
        assert!(hashed.starts_with("$2"));
        assert!(hasher.verify_password("1234", &hashed).unwrap());
        assert!(!hasher.verify_password("4321", &hashed).unwrap());
    }

    #[test]
    fn test_garbage_hash_does_not_match() {
        let hasher = BcryptHasher::development();
        assert!(!hasher.verify_password("1234", "plain-text").unwrap());
    }

    #[test]
    fn test_presets() {
        assert_eq!(BcryptHasher::development().cost(), 4);
        assert_eq!(BcryptHasher::production().cost(), 12);
        assert_eq!(BcryptHasher::default().cost(), DEFAULT_COST);
        assert_eq!(BcryptHasher::default().hasher_name(), "bcrypt");
    }
}
