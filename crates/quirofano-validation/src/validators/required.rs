//! Required field validator

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;

/// Validator that ensures a field is present and not blank
#[derive(Debug, Clone, Default)]
pub struct RequiredValidator {
    /// Custom error message
    pub message: Option<String>,
}

impl RequiredValidator {
    pub fn new() -> Self {
        Self { message: None }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    fn is_empty(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(arr) => arr.is_empty(),
            Value::Object(obj) => obj.is_empty(),
            _ => false,
        }
    }
}

#[async_trait]
impl ValidationRule for RequiredValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if Self::is_empty(value) {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} is required", field));
            Err(ValidationError::with_code(field, message, "required").into())
        } else {
            Ok(())
        }
    }

    fn rule_name(&self) -> &'static str {
        "required"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_null_and_blank_fail() {
        let validator = RequiredValidator::new();
        assert!(validator.validate(&Value::Null, "nombre").await.is_err());
        assert!(validator.validate(&json!("   "), "nombre").await.is_err());
        assert!(validator.validate(&json!([]), "items").await.is_err());
    }

    #[tokio::test]
    async fn test_present_values_pass() {
        let validator = RequiredValidator::new();
        assert!(validator.validate(&json!("Ana"), "nombre").await.is_ok());
        assert!(validator.validate(&json!(0), "numero").await.is_ok());
        assert!(validator.validate(&json!(false), "activo").await.is_ok());
    }

    #[tokio::test]
    async fn test_custom_message() {
        let validator = RequiredValidator::with_message("El nombre es requerido");
        let errors = validator.validate(&Value::Null, "nombre").await.unwrap_err();
        assert_eq!(errors.messages(), vec!["El nombre es requerido"]);
        assert_eq!(errors.errors[0].code, "required");
    }
}
