//! # quirofano-http
//!
//! The pieces every handler shares: the `{success, message, data|errors}`
//! envelope, the boundary error type, body and query extractors that answer
//! in that envelope, and the tracing subscriber setup.

pub mod error;
pub mod extract;
pub mod logging;
pub mod response;

pub use error::{HttpError, HttpResult};
pub use extract::{parse_body, validate_body, JsonBody, OptionalJsonBody, QueryParams};
pub use logging::{init_logging, log_startup_info, LoggingConfig};
pub use response::ApiResponse;
