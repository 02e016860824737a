//! Connection pool construction

use std::time::Duration;

use quirofano_core::DatabaseConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::ModelError;

/// Build a PostgreSQL pool from `config`; requires `config.url`
pub async fn create_database_pool(config: &DatabaseConfig) -> Result<PgPool, ModelError> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| ModelError::Configuration("DATABASE_URL is not set".to_string()))?;

    tracing::debug!(
        "Creating database pool: max={}, min={}, timeout={}s",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout_secs
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect(url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
            ModelError::Connection(format!("Failed to create database pool: {}", e))
        })?;

    tracing::info!(
        url = ?config.redacted_url(),
        max_connections = config.max_connections,
        "Database pool created"
    );
    Ok(pool)
}
