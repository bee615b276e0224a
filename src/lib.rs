//! # appschema: multi-tenant schema provisioning for PostgreSQL
//!
//! One PostgreSQL schema per tenant, tracked by a row in a shared table:
//! provisioning creates both, populates the schema via per-app table sync,
//! applies outstanding per-app migrations inside the schema, and rolls the
//! whole thing back on any failure. Teardown removes the row and drops the
//! schema with CASCADE, tolerating schemas that never physically existed.
//!
//! ```no_run
//! use appschema::{App, AppRegistry, ProvisionOptions, Provisioner};
//!
//! # async fn demo() -> appschema::SchemaResult<()> {
//! let pool = appschema::create_pool("postgresql://localhost/app").await?;
//! let registry = AppRegistry::new(vec![
//!     App::new("blog")
//!         .with_sync_sql("CREATE TABLE posts (id SERIAL PRIMARY KEY, title TEXT NOT NULL);")
//!         .with_migrations_dir("migrations/blog"),
//! ]);
//!
//! let provisioner = Provisioner::new(pool, registry);
//! provisioner.ensure_ready().await?;
//! provisioner
//!     .new_schema("acme", "Acme Corp", true, ProvisionOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod database;
pub mod error;
pub mod migrate;
pub mod migrations;
pub mod provision;
pub mod schema;
pub mod security;
pub mod store;
pub mod sync;

// Re-export core types
pub use apps::{App, AppRegistry};
pub use database::{create_pool, create_pool_with_config, PoolConfig};
pub use error::{SchemaError, SchemaResult};
pub use migrate::{MigrateExecutor, SchemaMigrateExecutor};
pub use migrations::{
    Migration, MigrationConfig, MigrationManager, MigrationRecord, MigrationRunResult,
    SchemaMigrationRunner,
};
pub use provision::{ProvisionOptions, Provisioner};
pub use schema::{Schema, SchemaRepository};
pub use security::{quote_identifier, validate_schema_name};
pub use store::{InMemoryPathCache, SchemaPathCache};
pub use sync::{SqlSyncExecutor, SyncExecutor, SyncReport};
