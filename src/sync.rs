//! Sync phase - initial table creation per tenant schema
//!
//! Sync creates an app's initial tables inside a tenant schema from the
//! app's declared `sync_sql`. Apps whose tables come entirely from
//! migration files have nothing to sync and are skipped.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::apps::App;
use crate::error::{SchemaError, SchemaResult};
use crate::migrations::{MigrationConfig, MigrationManager, SchemaMigrationRunner};
use crate::provision::ProvisionOptions;
use crate::security::quote_identifier;

/// Outcome of a sync run
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Names of apps whose initial tables were created
    pub synced_apps: Vec<String>,
    /// Total number of SQL statements executed
    pub statements_run: usize,
}

/// Executes the sync phase for a set of apps against a tenant schema
#[async_trait]
pub trait SyncExecutor: Send + Sync {
    async fn sync_apps(
        &self,
        apps: &[App],
        schema: &str,
        options: &ProvisionOptions,
    ) -> SchemaResult<SyncReport>;
}

/// Default sync executor: runs each app's `sync_sql` in one transaction with
/// the `search_path` pinned to the tenant schema
pub struct SqlSyncExecutor {
    pool: PgPool,
    manager: MigrationManager,
}

impl SqlSyncExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, MigrationConfig::default())
    }

    pub fn with_config(pool: PgPool, config: MigrationConfig) -> Self {
        Self {
            pool,
            manager: MigrationManager::with_config(config),
        }
    }

    async fn sync_app(&self, app: &App, schema: &str) -> SchemaResult<usize> {
        let Some(sync_sql) = &app.sync_sql else {
            tracing::debug!(app = %app.name, "no sync SQL declared, skipping");
            return Ok(0);
        };

        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| SchemaError::Sync(format!("Failed to start sync transaction: {}", e)))?;

        sqlx::query(&format!(
            "SET LOCAL search_path TO {}",
            quote_identifier(schema)
        ))
        .execute(&mut *transaction)
        .await
        .map_err(|e| SchemaError::Sync(format!("Failed to set search_path: {}", e)))?;

        let mut executed = 0;
        for statement in self.manager.split_sql_statements(sync_sql)? {
            if !statement.trim().is_empty() {
                sqlx::query(&statement)
                    .execute(&mut *transaction)
                    .await
                    .map_err(|e| {
                        SchemaError::Sync(format!("Failed to sync app '{}': {}", app.name, e))
                    })?;
                executed += 1;
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| SchemaError::Sync(format!("Failed to commit sync: {}", e)))?;

        Ok(executed)
    }
}

#[async_trait]
impl SyncExecutor for SqlSyncExecutor {
    async fn sync_apps(
        &self,
        apps: &[App],
        schema: &str,
        options: &ProvisionOptions,
    ) -> SchemaResult<SyncReport> {
        let mut report = SyncReport::default();

        for app in apps {
            let executed = self.sync_app(app, schema).await?;
            if executed > 0 {
                if options.verbosity > 0 {
                    tracing::info!(schema, app = %app.name, statements = executed, "synced app");
                } else {
                    tracing::debug!(schema, app = %app.name, statements = executed, "synced app");
                }
                report.synced_apps.push(app.name.clone());
                report.statements_run += executed;
            }
        }

        // Mirrors syncdb --migrate: optionally chain a migration run after
        // table creation. The provisioner always disables this because it
        // runs migration as its own phase.
        if options.migrate {
            for app in apps.iter().filter(|app| app.has_migrations()) {
                let runner = SchemaMigrationRunner::new(
                    self.manager.clone(),
                    self.pool.clone(),
                    schema,
                );
                runner.run_app_migrations(app).await?;
            }
        }

        Ok(report)
    }
}
