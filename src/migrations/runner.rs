//! Schema-scoped migration execution
//!
//! A runner is bound to one tenant schema: the tracking table lives inside
//! that schema and every migration transaction pins its `search_path` there,
//! so identical migration files can be applied to any number of tenants.

use sqlx::{PgPool, Row};
use std::collections::HashSet;

use super::definitions::{Migration, MigrationRecord, MigrationRunResult};
use super::manager::MigrationManager;
use crate::apps::App;
use crate::error::{SchemaError, SchemaResult};
use crate::security::quote_identifier;

/// Count the tracking records belonging to one app's `"<app>:<id>"` namespace
fn count_app_records(applied_ids: &HashSet<String>, app_name: &str) -> usize {
    let prefix = format!("{}:", app_name);
    applied_ids
        .iter()
        .filter(|id| id.starts_with(&prefix))
        .count()
}

/// Executes migrations against one tenant schema
pub struct SchemaMigrationRunner {
    manager: MigrationManager,
    pool: PgPool,
    schema: String,
}

impl SchemaMigrationRunner {
    pub fn new(manager: MigrationManager, pool: PgPool, schema: &str) -> Self {
        Self {
            manager,
            pool,
            schema: schema.to_string(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Run all pending migrations for one app into this runner's schema
    pub async fn run_app_migrations(&self, app: &App) -> SchemaResult<MigrationRunResult> {
        let start_time = std::time::Instant::now();

        let Some(dir) = &app.migrations_dir else {
            return Ok(MigrationRunResult::default());
        };

        self.ensure_migrations_table().await?;

        let all_migrations = self.manager.load_migrations(dir)?;

        let applied_migrations = self.get_applied_migrations().await?;
        let applied_ids: HashSet<String> = applied_migrations.into_iter().map(|m| m.id).collect();

        // Ids are namespaced per app so one tracking table covers every app
        let pending: Vec<(String, Migration)> = all_migrations
            .into_iter()
            .map(|m| (format!("{}:{}", app.name, m.id), m))
            .filter(|(id, _)| !applied_ids.contains(id))
            .collect();

        // The tracking table holds every app's records; only this app's
        // already-applied migrations count as skipped.
        let skipped_count = count_app_records(&applied_ids, &app.name);

        if pending.is_empty() {
            return Ok(MigrationRunResult {
                applied_count: 0,
                applied_migrations: Vec::new(),
                skipped_count,
                execution_time_ms: start_time.elapsed().as_millis(),
            });
        }

        let next_batch = self.get_next_batch_number().await?;

        let mut applied = Vec::new();
        for (id, migration) in &pending {
            tracing::info!(
                schema = %self.schema,
                app = %app.name,
                migration = %migration.id,
                "applying migration"
            );
            self.apply_migration(id, migration, next_batch).await?;
            applied.push(id.clone());
        }

        Ok(MigrationRunResult {
            applied_count: applied.len(),
            applied_migrations: applied,
            skipped_count,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }

    /// Apply a single migration inside its own transaction
    async fn apply_migration(
        &self,
        record_id: &str,
        migration: &Migration,
        batch: i32,
    ) -> SchemaResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| SchemaError::Migration(format!("Failed to start transaction: {}", e)))?;

        // Unqualified table references in the migration resolve to the tenant
        // schema for the duration of this transaction.
        sqlx::query(&self.set_search_path_sql())
            .execute(&mut *transaction)
            .await
            .map_err(|e| SchemaError::Migration(format!("Failed to set search_path: {}", e)))?;

        if !migration.up_sql.trim().is_empty() {
            for statement in self.manager.split_sql_statements(&migration.up_sql)? {
                if !statement.trim().is_empty() {
                    sqlx::query(&statement)
                        .execute(&mut *transaction)
                        .await
                        .map_err(|e| {
                            SchemaError::Migration(format!(
                                "Failed to execute migration {}: {}",
                                migration.id, e
                            ))
                        })?;
                }
            }
        }

        sqlx::query(&self.record_migration_sql())
            .bind(record_id)
            .bind(chrono::Utc::now())
            .bind(batch)
            .execute(&mut *transaction)
            .await
            .map_err(|e| SchemaError::Migration(format!("Failed to record migration: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| SchemaError::Migration(format!("Failed to commit migration: {}", e)))?;

        Ok(())
    }

    async fn ensure_migrations_table(&self) -> SchemaResult<()> {
        sqlx::query(&self.create_migrations_table_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                SchemaError::Migration(format!("Failed to create migrations table: {}", e))
            })?;
        Ok(())
    }

    async fn get_applied_migrations(&self) -> SchemaResult<Vec<MigrationRecord>> {
        let rows = sqlx::query(&self.get_applied_migrations_sql())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                SchemaError::Migration(format!("Failed to query applied migrations: {}", e))
            })?;

        let mut records = Vec::new();
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| SchemaError::Migration(format!("Failed to get migration id: {}", e)))?;
            let applied_at: chrono::DateTime<chrono::Utc> = row
                .try_get("applied_at")
                .map_err(|e| SchemaError::Migration(format!("Failed to get applied_at: {}", e)))?;
            let batch: i32 = row
                .try_get("batch")
                .map_err(|e| SchemaError::Migration(format!("Failed to get batch: {}", e)))?;

            records.push(MigrationRecord {
                id,
                applied_at,
                batch,
            });
        }

        Ok(records)
    }

    async fn get_next_batch_number(&self) -> SchemaResult<i32> {
        let row = sqlx::query(&self.get_latest_batch_sql())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SchemaError::Migration(format!("Failed to get latest batch: {}", e)))?;

        let latest_batch: i32 = row.try_get(0).unwrap_or(0);
        Ok(latest_batch + 1)
    }

    /// Tracking table qualified with the tenant schema
    fn qualified_table(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.manager.config().migrations_table)
        )
    }

    fn set_search_path_sql(&self) -> String {
        format!("SET LOCAL search_path TO {}", quote_identifier(&self.schema))
    }

    fn create_migrations_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id VARCHAR(255) PRIMARY KEY,\n    \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n    \
                batch INTEGER NOT NULL\n\
            );",
            self.qualified_table()
        )
    }

    fn record_migration_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id, applied_at, batch) VALUES ($1, $2, $3)",
            self.qualified_table()
        )
    }

    fn get_latest_batch_sql(&self) -> String {
        format!("SELECT COALESCE(MAX(batch), 0) FROM {}", self.qualified_table())
    }

    fn get_applied_migrations_sql(&self) -> String {
        format!(
            "SELECT id, applied_at, batch FROM {} ORDER BY batch DESC, applied_at DESC",
            self.qualified_table()
        )
    }
}
