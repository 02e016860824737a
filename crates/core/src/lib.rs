//! Shared configuration for the quirófano service.
//!
//! Everything here is loaded from environment variables once at startup and
//! handed to the storage, auth and HTTP layers.

pub mod app_config;

pub use app_config::{
    AppConfig, AppConfigTrait, AuthConfig, ConfigError, ConfigSource, DatabaseConfig,
    Environment, LoggingConfig, ServerConfig, StoreBackend,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name used in startup logs and the root endpoint
pub const SERVICE_NAME: &str = "quirofano-api";

/// Get service version
pub fn version() -> &'static str {
    VERSION
}
