//! # quirofano-testing
//!
//! Drives an axum `Router` in-process with `tower::ServiceExt::oneshot`, so
//! integration tests exercise the real routing, extractors and middleware
//! without binding a socket.

pub mod client;

pub use client::{RequestBuilder, TestClient, TestResponse};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Assertion failed: {message}")]
    Assertion { message: String },

    #[error("Request error: {0}")]
    Request(String),
}

pub type TestResult<T> = Result<T, TestError>;

/// Test utilities and helper functions
pub mod utils {
    use rand::Rng;

    /// Generate a random test string with optional prefix
    pub fn random_string(prefix: Option<&str>) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();

        match prefix {
            Some(p) => format!("{}_{}", p, suffix),
            None => suffix,
        }
    }

    /// Generate a random test email
    pub fn random_email() -> String {
        format!("test_{}@hospital.com", random_string(None).to_lowercase())
    }

    /// Identity number: `V` followed by eight digits
    pub fn random_cedula() -> String {
        let number: u32 = rand::thread_rng().gen_range(10_000_000..99_999_999);
        format!("V{}", number)
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{utils, TestClient, TestError, TestResponse, TestResult};
    pub use serde_json::{json, Value as JsonValue};
}

#[cfg(test)]
mod tests {
    use crate::utils;

    #[test]
    fn test_random_string_generation() {
        let s1 = utils::random_string(None);
        let s2 = utils::random_string(None);
        assert_eq!(s1.len(), 8);
        assert_ne!(s1, s2);

        assert!(utils::random_string(Some("user")).starts_with("user_"));
    }

    #[test]
    fn test_random_identity_data() {
        assert!(utils::random_email().ends_with("@hospital.com"));
        let cedula = utils::random_cedula();
        assert!(cedula.starts_with('V'));
        assert_eq!(cedula.len(), 9);
    }
}
