//! Error types for the persistence layer
//!
//! Storage backends report failures through [`ModelError`]. Domain-level
//! conflicts detected inside a transaction (double-booked room, short stock,
//! concurrent state change) get their own variants so handlers can turn them
//! into the right HTTP response.

use std::fmt;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Error types for storage operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Database connection or query error
    Database(String),
    /// Row not found
    NotFound(String),
    /// Unique constraint violated
    Conflict(String),
    /// Row failed a model-level check
    Validation(String),
    /// Another non-cancelled surgery holds the room inside the conflict window
    RoomUnavailable,
    /// No stock row can cover the requested quantity for this item
    InsufficientStock { item_id: i32 },
    /// The surgery changed state between read and write
    StaleState { cirugia_id: i32 },
    /// Serialization/deserialization error
    Serialization(String),
    /// Migration error
    Migration(String),
    /// Connection pool error
    Connection(String),
    /// Transaction error
    Transaction(String),
    /// Configuration error
    Configuration(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::NotFound(table) => write!(f, "Record not found in table '{}'", table),
            ModelError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ModelError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ModelError::RoomUnavailable => {
                write!(f, "Operating room already booked inside the conflict window")
            }
            ModelError::InsufficientStock { item_id } => {
                write!(f, "Insufficient stock for item {}", item_id)
            }
            ModelError::StaleState { cirugia_id } => {
                write!(f, "Surgery {} changed state concurrently", cirugia_id)
            }
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ModelError::Migration(msg) => write!(f, "Migration error: {}", msg),
            ModelError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ModelError::Transaction(msg) => write!(f, "Transaction error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Unique violations surface as conflicts so callers can answer 409
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ModelError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            sqlx::Error::RowNotFound => ModelError::NotFound("row".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                ModelError::Connection(err.to_string())
            }
            _ => ModelError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ModelError::NotFound("cirugias".to_string()).to_string(),
            "Record not found in table 'cirugias'"
        );
        assert_eq!(
            ModelError::InsufficientStock { item_id: 7 }.to_string(),
            "Insufficient stock for item 7"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ModelError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ModelError::NotFound(_)));
    }
}
