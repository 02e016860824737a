//! Length-based validators for strings and collections

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;

/// Validator for string/array length constraints
#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    /// Minimum length (inclusive)
    pub min: Option<usize>,
    /// Maximum length (inclusive)
    pub max: Option<usize>,
    /// Custom error message
    pub message: Option<String>,
}

impl LengthValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Characters for strings, elements for arrays
    fn get_length(value: &Value) -> Option<usize> {
        match value {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(arr) => Some(arr.len()),
            _ => None,
        }
    }

    fn create_error_message(&self, field: &str) -> String {
        if let Some(ref custom_message) = self.message {
            return custom_message.clone();
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                format!("{} must be between {} and {} characters long", field, min, max)
            }
            (Some(min), None) => format!("{} must be at least {} characters long", field, min),
            (None, Some(max)) => format!("{} must be at most {} characters long", field, max),
            (None, None) => format!("{} has invalid length", field),
        }
    }
}

#[async_trait]
impl ValidationRule for LengthValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        let within = Self::get_length(value).map_or(false, |len| {
            self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max)
        });
        if within {
            Ok(())
        } else {
            Err(ValidationError::with_code(field, self.create_error_message(field), "length").into())
        }
    }

    fn rule_name(&self) -> &'static str {
        "length"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_minimum_length() {
        let validator = LengthValidator::new().min(6);
        assert!(validator.validate(&json!("123456"), "password").await.is_ok());
        assert!(validator.validate(&json!("12345"), "password").await.is_err());
        assert!(validator.validate(&Value::Null, "password").await.is_err());
    }

    #[tokio::test]
    async fn test_length_counts_characters() {
        let validator = LengthValidator::new().max(4);
        assert!(validator.validate(&json!("ñañá"), "x").await.is_ok());
    }

    #[tokio::test]
    async fn test_default_message() {
        let validator = LengthValidator::new().min(6);
        let errors = validator.validate(&json!("1"), "password").await.unwrap_err();
        assert_eq!(
            errors.messages(),
            vec!["password must be at least 6 characters long"]
        );
    }
}
