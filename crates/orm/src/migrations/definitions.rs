//! Migration definitions
//!
//! Migrations ship inside the binary. Each source file carries an
//! `-- Up migration` section and an optional `-- Down migration` section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the table that records applied migrations
pub const MIGRATIONS_TABLE: &str = "quirofano_migrations";

const UP_MARKER: &str = "-- Up migration";
const DOWN_MARKER: &str = "-- Down migration";

/// Represents a database migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Sort key, the file prefix
    pub id: String,
    pub name: String,
    pub up_sql: String,
    pub down_sql: String,
}

impl Migration {
    /// Split a migration source into its up and down sections
    pub fn from_source(id: &str, name: &str, source: &str) -> Self {
        let body = match source.find(UP_MARKER) {
            Some(pos) => &source[pos + UP_MARKER.len()..],
            None => source,
        };
        let (up, down) = match body.find(DOWN_MARKER) {
            Some(pos) => (&body[..pos], &body[pos + DOWN_MARKER.len()..]),
            None => (body, ""),
        };

        Self {
            id: id.to_string(),
            name: name.to_string(),
            up_sql: up.trim().to_string(),
            down_sql: down.trim().to_string(),
        }
    }
}

/// Row of the migrations table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MigrationRecord {
    pub id: String,
    pub applied_at: DateTime<Utc>,
    /// Migrations applied by one run share a batch
    pub batch: i32,
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationRunResult {
    pub applied_count: usize,
    pub applied_migrations: Vec<String>,
    /// Already applied before this run
    pub skipped_count: usize,
    pub execution_time_ms: u128,
}

/// Every migration compiled into the binary, in apply order
pub fn embedded() -> Vec<Migration> {
    vec![Migration::from_source(
        "0001",
        "create_schema",
        include_str!("../../migrations/0001_create_schema.sql"),
    )]
}

/// Split a script on `;`.
///
/// Migration scripts must not put semicolons inside literals or bodies.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !is_comment_only(s))
        .map(|s| format!("{};", s))
        .collect()
}

fn is_comment_only(statement: &str) -> bool {
    statement
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_splits_sections() {
        let source = "-- Migration: test1\n-- Up migration\nCREATE TABLE test1 (id INT);\n-- Down migration\nDROP TABLE test1;";
        let migration = Migration::from_source("0001", "test1", source);

        assert_eq!(migration.up_sql, "CREATE TABLE test1 (id INT);");
        assert_eq!(migration.down_sql, "DROP TABLE test1;");
    }

    #[test]
    fn test_missing_down_section() {
        let migration = Migration::from_source("0002", "only_up", "-- Up migration\nSELECT 1;");
        assert_eq!(migration.up_sql, "SELECT 1;");
        assert!(migration.down_sql.is_empty());
    }

    #[test]
    fn test_split_skips_blank_and_comment_chunks() {
        let statements = split_sql_statements("CREATE TABLE a (id INT);\n\n-- trailing note\n;CREATE INDEX i ON a (id);");
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (id INT);", "CREATE INDEX i ON a (id);"]
        );
    }

    #[test]
    fn test_embedded_schema_creates_every_table() {
        let migrations = embedded();
        assert_eq!(migrations[0].id, "0001");

        let up = &migrations[0].up_sql;
        for table in [
            "roles",
            "usuarios",
            "sesiones_usuario",
            "pacientes",
            "quirofanos",
            "cirugias",
            "cirugia_personal",
            "stock",
            "cirugia_stock_asignado",
            "entregas_stock",
            "esterilizaciones",
            "conteos_instrumentacion",
            "detalle_conteos",
            "incidentes",
            "notificaciones",
        ] {
            assert!(
                up.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)),
                "missing table {}",
                table
            );
        }
        assert!(!migrations[0].down_sql.contains("CREATE TABLE"));
    }
}
