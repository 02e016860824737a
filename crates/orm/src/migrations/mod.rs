//! Schema migrations

pub mod definitions;
pub mod runner;

pub use definitions::{
    embedded, split_sql_statements, Migration, MigrationRecord, MigrationRunResult,
    MIGRATIONS_TABLE,
};
pub use runner::MigrationRunner;
