//! Per-schema migration system
//!
//! Migration files are plain `.sql` files with `-- up` / `-- down` sections,
//! loaded per app and applied into a target tenant schema. Applied-migration
//! state lives in a tracking table inside that schema, so every tenant
//! carries its own history.

pub mod definitions;
pub mod manager;
pub mod runner;

pub use definitions::{Migration, MigrationConfig, MigrationRecord, MigrationRunResult};
pub use manager::MigrationManager;
pub use runner::SchemaMigrationRunner;
