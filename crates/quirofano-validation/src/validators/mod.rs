//! Built-in validators

pub mod email;
pub mod length;
pub mod numeric;
pub mod required;
