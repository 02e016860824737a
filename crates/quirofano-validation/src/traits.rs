//! Core validation trait

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ValidationResult;

/// Core validation trait that all validators must implement
#[async_trait]
pub trait ValidationRule: Send + Sync {
    /// Validate a single value; an absent field arrives as `Value::Null`
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()>;

    /// Get the validation rule name/type
    fn rule_name(&self) -> &'static str;
}
