//! Numeric validator

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;

/// Validator for JSON numbers with optional integer and range constraints
#[derive(Debug, Clone, Default)]
pub struct NumericValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer_only: bool,
    /// Custom error message
    pub message: Option<String>,
}

impl NumericValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn integer_only(mut self) -> Self {
        self.integer_only = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Integer >= 1, the shape of every row id
    pub fn positive_id() -> Self {
        Self::new().integer_only().min(1.0)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        let Some(number) = value.as_f64() else {
            return false;
        };
        if self.integer_only && !(value.is_i64() || value.is_u64()) {
            return false;
        }
        self.min.map_or(true, |min| number >= min) && self.max.map_or(true, |max| number <= max)
    }
}

#[async_trait]
impl ValidationRule for NumericValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} must be a valid number", field));
            Err(ValidationError::with_code(field, message, "numeric").into())
        }
    }

    fn rule_name(&self) -> &'static str {
        "numeric"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_positive_id() {
        let validator = NumericValidator::positive_id();
        assert!(validator.validate(&json!(3), "rol_id").await.is_ok());
        assert!(validator.validate(&json!(0), "rol_id").await.is_err());
        assert!(validator.validate(&json!(-2), "rol_id").await.is_err());
        assert!(validator.validate(&json!(1.5), "rol_id").await.is_err());
        assert!(validator.validate(&json!("3"), "rol_id").await.is_err());
        assert!(validator.validate(&Value::Null, "rol_id").await.is_err());
    }

    #[tokio::test]
    async fn test_range() {
        let validator = NumericValidator::new().min(0.0).max(10.0);
        assert!(validator.validate(&json!(2.5), "x").await.is_ok());
        assert!(validator.validate(&json!(11), "x").await.is_err());
    }
}
