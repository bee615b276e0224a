//! Schema tracking model and repository
//!
//! A `Schema` row is the logical source of truth for which tenant schemas
//! exist; the physical database schema mirrors it but can drift on partial
//! failure, which the provisioner compensates for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::fmt;
use uuid::Uuid;

use crate::error::{SchemaError, SchemaResult};
use crate::security::quote_identifier;

/// Default name of the tracking table
pub const SCHEMAS_TABLE: &str = "appschema_schemas";

/// A tenant schema tracking row
///
/// The (`name`, `public_name`) pair is unique across all rows; `name` doubles
/// as the physical database schema name.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schema {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub name: String,
    pub public_name: String,
    pub is_active: bool,
}

impl Schema {
    pub fn new(name: &str, public_name: &str, is_active: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            created: Utc::now(),
            name: name.to_string(),
            public_name: public_name.to_string(),
            is_active,
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.public_name)
    }
}

/// Repository over the schema tracking table
#[derive(Debug, Clone)]
pub struct SchemaRepository {
    pool: PgPool,
    table: String,
}

impl SchemaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, SCHEMAS_TABLE)
    }

    pub fn with_table(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    /// Quoted tracking table name for SQL interpolation
    pub fn table(&self) -> String {
        quote_identifier(&self.table)
    }

    /// Create the tracking table and its indexes if they do not exist
    pub async fn ensure_table(&self) -> SchemaResult<()> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await?;
        sqlx::query(&self.create_active_index_sql())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert a tracking row
    ///
    /// A unique violation on (`name`, `public_name`) surfaces as
    /// `SchemaError::AlreadyExists`.
    pub async fn insert(&self, schema: &Schema) -> SchemaResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, created, name, public_name, is_active) VALUES ($1, $2, $3, $4, $5)",
            self.table()
        );

        sqlx::query(&sql)
            .bind(schema.id)
            .bind(schema.created)
            .bind(&schema.name)
            .bind(&schema.public_name)
            .bind(schema.is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if SchemaError::is_unique_violation(&e) {
                    SchemaError::AlreadyExists {
                        name: schema.name.clone(),
                        public_name: schema.public_name.clone(),
                    }
                } else {
                    SchemaError::Database(e)
                }
            })?;

        Ok(())
    }

    pub async fn find_by_name(&self, name: &str) -> SchemaResult<Option<Schema>> {
        let sql = format!(
            "SELECT id, created, name, public_name, is_active FROM {} WHERE name = $1",
            self.table()
        );
        let schema = sqlx::query_as::<_, Schema>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(schema)
    }

    /// Delete rows for a schema name inside the caller's transaction
    pub async fn delete_by_name(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> SchemaResult<u64> {
        let sql = format!("DELETE FROM {} WHERE name = $1", self.table());
        let result = sqlx::query(&sql).bind(name).execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    /// All rows with `is_active = true`
    pub async fn active(&self) -> SchemaResult<Vec<Schema>> {
        let sql = format!(
            "SELECT id, created, name, public_name, is_active FROM {} WHERE is_active = TRUE ORDER BY created",
            self.table()
        );
        let schemas = sqlx::query_as::<_, Schema>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(schemas)
    }

    pub async fn all(&self) -> SchemaResult<Vec<Schema>> {
        let sql = format!(
            "SELECT id, created, name, public_name, is_active FROM {} ORDER BY created",
            self.table()
        );
        let schemas = sqlx::query_as::<_, Schema>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(schemas)
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                id UUID PRIMARY KEY,\n    \
                created TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n    \
                name VARCHAR(64) NOT NULL,\n    \
                public_name VARCHAR(255) NOT NULL,\n    \
                is_active BOOLEAN NOT NULL DEFAULT TRUE,\n    \
                UNIQUE (name, public_name)\n\
            );",
            self.table()
        )
    }

    fn create_active_index_sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (is_active);",
            quote_identifier(&format!("{}_is_active_idx", self.table)),
            self.table()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repository() -> SchemaRepository {
        let pool = PgPool::connect_lazy("postgresql://localhost/appschema_test")
            .expect("lazy pool construction cannot fail");
        SchemaRepository::new(pool)
    }

    #[test]
    fn test_schema_display() {
        let schema = Schema::new("tenant_1", "Tenant One", true);
        assert_eq!(schema.to_string(), "tenant_1 (Tenant One)");
    }

    #[test]
    fn test_new_schema_defaults() {
        let schema = Schema::new("tenant_1", "Tenant One", false);
        assert_eq!(schema.name, "tenant_1");
        assert_eq!(schema.public_name, "Tenant One");
        assert!(!schema.is_active);
        assert!(schema.created <= Utc::now());
    }

    #[test]
    fn test_schema_serializes_with_expected_fields() {
        let schema = Schema::new("tenant_1", "Tenant One", true);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["name"], "tenant_1");
        assert_eq!(value["public_name"], "Tenant One");
        assert_eq!(value["is_active"], true);
        assert!(value["id"].is_string());
        assert!(value["created"].is_string());
    }

    #[tokio::test]
    async fn test_create_table_sql_has_composite_unique() {
        let repo = test_repository();
        let sql = repo.create_table_sql();
        assert!(sql.contains("UNIQUE (name, public_name)"));
        assert!(sql.contains("\"appschema_schemas\""));
    }

    #[tokio::test]
    async fn test_active_index_sql() {
        let repo = test_repository();
        let sql = repo.create_active_index_sql();
        assert!(sql.contains("\"appschema_schemas_is_active_idx\""));
        assert!(sql.contains("(is_active)"));
    }
}
