//! Applies the embedded migrations that the database has not seen yet.
//!
//! Each migration runs in its own transaction together with the row that
//! records it in [`MIGRATIONS_TABLE`]. Migrations applied by one run share a
//! batch number.

use std::collections::HashSet;
use std::time::Instant;

use sqlx::PgPool;

use super::definitions::{
    embedded, split_sql_statements, Migration, MigrationRecord, MigrationRunResult,
    MIGRATIONS_TABLE,
};
use crate::error::{ModelError, OrmResult};

fn failed(step: &str) -> impl Fn(sqlx::Error) -> ModelError + '_ {
    move |e| ModelError::Migration(format!("{}: {}", step, e))
}

pub struct MigrationRunner {
    migrations: Vec<Migration>,
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self {
            migrations: embedded(),
            pool,
        }
    }

    pub async fn run_migrations(&self) -> OrmResult<MigrationRunResult> {
        let started = Instant::now();
        self.create_table().await?;

        let seen: HashSet<String> = self.applied().await?.into_iter().map(|r| r.id).collect();
        let mut result = MigrationRunResult {
            applied_count: 0,
            applied_migrations: Vec::new(),
            skipped_count: seen.len(),
            execution_time_ms: 0,
        };

        let pending: Vec<&Migration> = self
            .migrations
            .iter()
            .filter(|m| !seen.contains(&m.id))
            .collect();
        if !pending.is_empty() {
            let batch = self.last_batch().await? + 1;
            for migration in pending {
                tracing::info!(id = %migration.id, name = %migration.name, batch, "Applying migration");
                self.apply(migration, batch).await?;
                result.applied_migrations.push(migration.id.clone());
            }
        }

        result.applied_count = result.applied_migrations.len();
        result.execution_time_ms = started.elapsed().as_millis();
        Ok(result)
    }

    async fn apply(&self, migration: &Migration, batch: i32) -> OrmResult<()> {
        let mut tx = self.pool.begin().await.map_err(failed("begin"))?;

        for statement in split_sql_statements(&migration.up_sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| ModelError::Migration(format!("{} {}: {}", migration.id, migration.name, e)))?;
        }

        sqlx::query(&format!(
            "INSERT INTO {} (id, applied_at, batch) VALUES ($1, NOW(), $2)",
            MIGRATIONS_TABLE
        ))
        .bind(&migration.id)
        .bind(batch)
        .execute(&mut *tx)
        .await
        .map_err(failed("record"))?;

        tx.commit().await.map_err(failed("commit"))
    }

    async fn create_table(&self) -> OrmResult<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id VARCHAR(255) PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                batch INTEGER NOT NULL
            )",
            MIGRATIONS_TABLE
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(failed("create migrations table"))?;
        Ok(())
    }

    async fn applied(&self) -> OrmResult<Vec<MigrationRecord>> {
        let sql = format!("SELECT id, applied_at, batch FROM {} ORDER BY id", MIGRATIONS_TABLE);
        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(failed("list applied migrations"))
    }

    async fn last_batch(&self) -> OrmResult<i32> {
        let sql = format!("SELECT COALESCE(MAX(batch), 0) FROM {}", MIGRATIONS_TABLE);
        sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(failed("read batch"))
    }
}
