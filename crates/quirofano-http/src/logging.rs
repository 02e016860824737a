//! Structured logging setup
//!
//! One `tracing-subscriber` registry is installed at startup. `RUST_LOG`
//! takes precedence over the configured filter when it is set.

use std::io;

use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the service
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Emit JSON lines
    pub json_format: bool,
    /// Multi-line human output
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Directive list such as "quirofano=debug,tower_http=info"
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create production logging configuration
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            include_location: false,
            env_filter: Some("info,tower_http=warn,sqlx=warn".to_string()),
        }
    }

    /// Create development logging configuration
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: true,
            env_filter: Some("debug,tower_http=debug,sqlx=info".to_string()),
        }
    }

    /// Create test logging configuration (minimal output)
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: Some("error".to_string()),
        }
    }

    /// From the `LOG_LEVEL` / `LOG_FORMAT` settings (compact, pretty or json)
    pub fn from_settings(level: &str, format: &str) -> Self {
        let format = format.to_lowercase();
        Self {
            level: level.to_lowercase(),
            json_format: format == "json",
            pretty_print: format == "pretty",
            include_location: false,
            env_filter: None,
        }
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter_directives(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Initialize structured logging for the application
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        registry.with(layer.json()).try_init()?;
    } else if config.pretty_print {
        registry.with(layer.pretty()).try_init()?;
    } else {
        registry.with(layer.compact()).try_init()?;
    }

    tracing::info!(
        "Structured logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "JSON" } else { "text" }
    );
    Ok(())
}

/// Log the identity of the running service once it is about to listen
pub fn log_startup_info(name: &str, version: &str, environment: &str, bind_address: &str) {
    tracing::info!(
        service = name,
        version = version,
        environment = environment,
        address = bind_address,
        "Service starting"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(LoggingConfig::production().json_format);
        assert!(LoggingConfig::development().pretty_print);
        assert_eq!(LoggingConfig::test().level, "error");
    }

    #[test]
    fn test_from_settings() {
        let json = LoggingConfig::from_settings("INFO", "json");
        assert!(json.json_format);
        assert_eq!(json.level, "info");
        assert_eq!(json.filter_directives(), "info");

        let compact = LoggingConfig::from_settings("warn", "compact");
        assert!(!compact.json_format);
        assert!(!compact.pretty_print);
    }

    #[test]
    fn test_env_filter_overrides_level() {
        let config = LoggingConfig::default().with_env_filter("quirofano_api=debug");
        assert_eq!(config.filter_directives(), "quirofano_api=debug");
    }
}
