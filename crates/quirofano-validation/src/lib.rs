//! # quirofano-validation
//!
//! Field-presence and format checks run against a JSON body before it is
//! deserialized. Rules run in the order they were added and every failure is
//! reported, so clients see the full list at once.

pub mod error;
pub mod rules;
pub mod traits;
pub mod validators;

pub use error::{ValidationError, ValidationErrors, ValidationResult};
pub use rules::Rules;
pub use traits::ValidationRule;

pub use validators::{
    email::EmailValidator, length::LengthValidator, numeric::NumericValidator,
    required::RequiredValidator,
};
