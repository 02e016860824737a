//! Email format validator

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;

static EMAIL_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

/// Validator for email address format
#[derive(Debug, Clone, Default)]
pub struct EmailValidator {
    /// Custom error message
    pub message: Option<String>,
}

impl EmailValidator {
    pub fn new() -> Self {
        Self { message: None }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_valid_email(email: &str) -> bool {
        match EMAIL_PATTERN.as_ref() {
            Ok(pattern) => pattern.is_match(email),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ValidationRule for EmailValidator {
    // Absent or non-string values fail as well
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let valid = value.as_str().map_or(false, Self::is_valid_email);
        if valid {
            Ok(())
        } else {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} must be a valid email address", field));
            Err(ValidationError::with_code(field, message, "email").into())
        }
    }

    fn rule_name(&self) -> &'static str {
        "email"
    }
}
