//! Core types for the per-schema migration system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parsed migration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Unique identifier (timestamp-prefixed filename stem)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// SQL statements to apply the migration
    pub up_sql: String,
    /// SQL statements to reverse the migration
    pub down_sql: String,
    /// When the migration was created
    pub created_at: DateTime<Utc>,
}

/// An applied-migration row in a tenant schema's tracking table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub id: String,
    pub applied_at: DateTime<Utc>,
    /// Batch number grouping migrations applied together
    pub batch: i32,
}

/// Configuration for the migration system
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Tracking table name, created inside each tenant schema
    pub migrations_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_table: "appschema_migrations".to_string(),
        }
    }
}

/// Result of a migration run against one tenant schema
#[derive(Debug, Default)]
pub struct MigrationRunResult {
    /// Number of migrations that were applied
    pub applied_count: usize,
    /// IDs of migrations that were applied
    pub applied_migrations: Vec<String>,
    /// Number of migrations skipped because they were already applied
    pub skipped_count: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    /// Fold another run result (e.g. from a further app) into this one
    pub fn merge(&mut self, other: MigrationRunResult) {
        self.applied_count += other.applied_count;
        self.applied_migrations.extend(other.applied_migrations);
        self.skipped_count += other.skipped_count;
        self.execution_time_ms += other.execution_time_ms;
    }
}
