//! Schema provisioning and teardown
//!
//! `new_schema` creates the tracking row and the physical schema, syncs and
//! migrates every isolated app into it, then resets the routing cache. Any
//! failure after the row exists triggers a compensating `drop_schema`, so a
//! caller only ever observes "fully provisioned" or "failed and rolled back".

use sqlx::PgPool;
use std::sync::Arc;

use crate::apps::AppRegistry;
use crate::error::{SchemaError, SchemaResult};
use crate::migrate::{MigrateExecutor, SchemaMigrateExecutor};
use crate::schema::{Schema, SchemaRepository};
use crate::security::{quote_identifier, validate_schema_name};
use crate::store::{InMemoryPathCache, SchemaPathCache};
use crate::sync::{SqlSyncExecutor, SyncExecutor};

/// Options applied to the sync and migrate phases
///
/// Defaults match the non-interactive silent mode the provisioner is meant
/// to run in: verbosity 0, no prompts, no migrate piggybacking on sync.
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// 0 is silent; higher values escalate phase logging to info
    pub verbosity: u8,
    pub interactive: bool,
    /// Whether a sync run may chain a migration run after table creation
    pub migrate: bool,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            verbosity: 0,
            interactive: false,
            migrate: false,
        }
    }
}

impl ProvisionOptions {
    /// Options for the sync phase: migration must never ride along with
    /// sync, it runs as its own phase afterwards.
    pub fn for_sync(&self) -> Self {
        Self {
            migrate: false,
            ..self.clone()
        }
    }
}

/// Provisions and tears down tenant schemas
pub struct Provisioner {
    pool: PgPool,
    repository: SchemaRepository,
    registry: AppRegistry,
    cache: Arc<dyn SchemaPathCache>,
    sync: Box<dyn SyncExecutor>,
    migrate: Box<dyn MigrateExecutor>,
}

impl Provisioner {
    pub fn new(pool: PgPool, registry: AppRegistry) -> Self {
        let repository = SchemaRepository::new(pool.clone());
        let sync = Box::new(SqlSyncExecutor::new(pool.clone()));
        let migrate = Box::new(SchemaMigrateExecutor::new(pool.clone()));
        Self {
            pool,
            repository,
            registry,
            cache: Arc::new(InMemoryPathCache::new()),
            sync,
            migrate,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SchemaPathCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_sync_executor(mut self, sync: Box<dyn SyncExecutor>) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_migrate_executor(mut self, migrate: Box<dyn MigrateExecutor>) -> Self {
        self.migrate = migrate;
        self
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn SchemaPathCache> {
        &self.cache
    }

    /// Create the tracking table if needed
    pub async fn ensure_ready(&self) -> SchemaResult<()> {
        self.repository.ensure_table().await
    }

    /// Provision a new tenant schema
    ///
    /// Inserts the tracking row, creates the physical schema, syncs all
    /// isolated apps into it, applies outstanding migrations, and resets the
    /// path cache. A duplicate (`name`, `public_name`) pair returns
    /// `AlreadyExists` without touching the database schema level. Any
    /// failure after the row insert rolls back via `drop_schema` and returns
    /// `ProvisioningFailed` carrying the original error.
    pub async fn new_schema(
        &self,
        name: &str,
        public_name: &str,
        is_active: bool,
        options: ProvisionOptions,
    ) -> SchemaResult<Schema> {
        validate_schema_name(name)?;

        let schema = Schema::new(name, public_name, is_active);
        self.repository.insert(&schema).await?;

        match self.provision(name, &options).await {
            Ok(()) => {
                self.cache.reset_path();
                tracing::info!(schema = name, public_name, "schema provisioned");
                Ok(schema)
            }
            Err(source) => {
                tracing::warn!(
                    schema = name,
                    error = %source,
                    "provisioning failed, rolling back"
                );
                if let Err(drop_err) = self.drop_schema(name).await {
                    tracing::warn!(
                        schema = name,
                        error = %drop_err,
                        "compensating drop failed"
                    );
                }
                Err(SchemaError::provisioning(name, source))
            }
        }
    }

    /// The fallible body of `new_schema`, run after the row insert
    async fn provision(&self, name: &str, options: &ProvisionOptions) -> SchemaResult<()> {
        sqlx::query(&format!("CREATE SCHEMA {}", quote_identifier(name)))
            .execute(&self.pool)
            .await?;

        let isolated = self.registry.isolated();
        self.sync
            .sync_apps(isolated, name, &options.for_sync())
            .await?;

        let candidates = self.registry.migration_candidates();
        self.migrate
            .migrate_apps(&candidates, name, options)
            .await?;

        Ok(())
    }

    /// Tear down a tenant schema
    ///
    /// Deletes the tracking row in one transaction, then drops the physical
    /// schema with CASCADE. The physical drop is best-effort: a database
    /// error (typically "schema does not exist") is swallowed, so dropping a
    /// name that was never provisioned is a no-op.
    pub async fn drop_schema(&self, name: &str) -> SchemaResult<()> {
        validate_schema_name(name)?;

        let mut tx = self.pool.begin().await?;
        let deleted = self.repository.delete_by_name(&mut tx, name).await?;
        tx.commit().await?;

        let drop_sql = format!("DROP SCHEMA {} CASCADE", quote_identifier(name));
        if let Err(e) = sqlx::query(&drop_sql).execute(&self.pool).await {
            tracing::debug!(schema = name, error = %e, "physical schema drop skipped");
        }

        self.cache.reset_path();
        tracing::info!(schema = name, rows_deleted = deleted, "schema dropped");
        Ok(())
    }

    /// Tracking rows with `is_active = true`
    pub async fn active_schemas(&self) -> SchemaResult<Vec<Schema>> {
        self.repository.active().await
    }

    /// All tracking rows
    pub async fn all_schemas(&self) -> SchemaResult<Vec<Schema>> {
        self.repository.all().await
    }
}
