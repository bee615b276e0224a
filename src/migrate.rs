//! Migrate phase - applying outstanding migrations to a tenant schema

use async_trait::async_trait;
use sqlx::PgPool;

use crate::apps::App;
use crate::error::SchemaResult;
use crate::migrations::{MigrationConfig, MigrationManager, MigrationRunResult, SchemaMigrationRunner};
use crate::provision::ProvisionOptions;

/// Executes the migrate phase for a set of apps against a tenant schema
#[async_trait]
pub trait MigrateExecutor: Send + Sync {
    async fn migrate_apps(
        &self,
        apps: &[App],
        schema: &str,
        options: &ProvisionOptions,
    ) -> SchemaResult<MigrationRunResult>;
}

/// Default migrate executor driving the schema-scoped runner per app
pub struct SchemaMigrateExecutor {
    pool: PgPool,
    config: MigrationConfig,
}

impl SchemaMigrateExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, MigrationConfig::default())
    }

    pub fn with_config(pool: PgPool, config: MigrationConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl MigrateExecutor for SchemaMigrateExecutor {
    async fn migrate_apps(
        &self,
        apps: &[App],
        schema: &str,
        options: &ProvisionOptions,
    ) -> SchemaResult<MigrationRunResult> {
        let mut result = MigrationRunResult::default();

        for app in apps {
            let runner = SchemaMigrationRunner::new(
                MigrationManager::with_config(self.config.clone()),
                self.pool.clone(),
                schema,
            );
            let app_result = runner.run_app_migrations(app).await?;

            if options.verbosity > 0 && app_result.applied_count > 0 {
                tracing::info!(
                    schema,
                    app = %app.name,
                    applied = app_result.applied_count,
                    "applied migrations"
                );
            }

            result.merge(app_result);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_apps_means_empty_result() {
        let pool = PgPool::connect_lazy("postgresql://localhost/appschema_test")
            .expect("lazy pool construction cannot fail");
        let executor = SchemaMigrateExecutor::new(pool);
        let result = executor
            .migrate_apps(&[], "tenant_1", &ProvisionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.applied_count, 0);
        assert_eq!(result.skipped_count, 0);
    }

    #[tokio::test]
    async fn test_apps_without_migration_dirs_touch_nothing() {
        let pool = PgPool::connect_lazy("postgresql://localhost/appschema_test")
            .expect("lazy pool construction cannot fail");
        let executor = SchemaMigrateExecutor::new(pool);
        // App without a migrations dir short-circuits before any query runs.
        let apps = vec![App::new("blog")];
        let result = executor
            .migrate_apps(&apps, "tenant_1", &ProvisionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.applied_count, 0);
    }
}
