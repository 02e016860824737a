//! Ordered rule sets

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ValidationErrors, ValidationResult};
use crate::traits::ValidationRule;

/// Field rules, checked in the order they were added
#[derive(Clone, Default)]
pub struct Rules {
    rules: Vec<(String, Arc<dyn ValidationRule>)>,
}

impl std::fmt::Debug for Rules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<(&str, &str)> = self
            .rules
            .iter()
            .map(|(field, rule)| (field.as_str(), rule.rule_name()))
            .collect();
        f.debug_struct("Rules").field("rules", &fields).finish()
    }
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation rule for a specific field
    pub fn field<R>(mut self, field: impl Into<String>, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        self.rules.push((field.into(), Arc::new(rule)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Run every rule against the matching key of `data`; missing keys and
    /// non-object bodies are checked as `null`
    pub async fn validate(&self, data: &Value) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();
        for (field, rule) in &self.rules {
            let value = data.get(field.as_str()).unwrap_or(&Value::Null);
            if let Err(rule_errors) = rule.validate(value, field).await {
                errors.merge(rule_errors);
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{
        email::EmailValidator, length::LengthValidator, numeric::NumericValidator,
        required::RequiredValidator,
    };
    use serde_json::json;

    fn registration_rules() -> Rules {
        Rules::new()
            .field("nombre", RequiredValidator::with_message("El nombre es requerido"))
            .field("email", EmailValidator::new().message("Email válido es requerido"))
            .field(
                "password",
                LengthValidator::new()
                    .min(6)
                    .message("La contraseña debe tener al menos 6 caracteres"),
            )
            .field(
                "rol_id",
                NumericValidator::positive_id().message("El ID del rol es requerido"),
            )
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let body = json!({
            "nombre": "Ana",
            "email": "ana@hospital.com",
            "password": "secreto",
            "rol_id": 2
        });
        assert!(registration_rules().validate(&body).await.is_ok());
    }

    #[tokio::test]
    async fn test_every_failure_is_reported_in_rule_order() {
        let body = json!({ "email": "nope", "password": "123" });
        let errors = registration_rules().validate(&body).await.unwrap_err();

        assert_eq!(
            errors.messages(),
            vec![
                "El nombre es requerido",
                "Email válido es requerido",
                "La contraseña debe tener al menos 6 caracteres",
                "El ID del rol es requerido",
            ]
        );
    }

    #[tokio::test]
    async fn test_non_object_body_fails_every_rule() {
        let errors = registration_rules().validate(&json!([1, 2])).await.unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
