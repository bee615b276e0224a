//! Error types for schema provisioning
//!
//! Provisioning failures are tagged so callers can branch programmatically
//! instead of parsing messages: a duplicate tenant surfaces as
//! `AlreadyExists`, and any failure after the tracking row exists surfaces
//! as `ProvisioningFailed` with the original error preserved as its source.

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Postgres SQLSTATE for a unique constraint violation
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Error types for schema provisioning and teardown
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema '{name}' ({public_name}) already exists")]
    AlreadyExists { name: String, public_name: String },

    #[error("Provisioning of schema '{schema}' failed: {source}")]
    ProvisioningFailed {
        schema: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Invalid schema name: {0}")]
    InvalidName(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Sync error: {0}")]
    Sync(String),
}

impl SchemaError {
    /// Wrap a post-insert failure in the compensating-rollback error kind
    pub(crate) fn provisioning(schema: &str, source: SchemaError) -> Self {
        SchemaError::ProvisioningFailed {
            schema: schema.to_string(),
            source: Box::new(source),
        }
    }

    /// Check whether a driver error is a unique constraint violation
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err
                .code()
                .map_or(false, |code| code_is_unique_violation(&code)),
            _ => false,
        }
    }
}

fn code_is_unique_violation(code: &str) -> bool {
    code == UNIQUE_VIOLATION_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_code_classification() {
        assert!(code_is_unique_violation("23505"));
        assert!(!code_is_unique_violation("23503")); // foreign key violation
        assert!(!code_is_unique_violation("42P06")); // duplicate schema
    }

    #[test]
    fn test_already_exists_display() {
        let err = SchemaError::AlreadyExists {
            name: "tenant_1".to_string(),
            public_name: "Tenant One".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Schema 'tenant_1' (Tenant One) already exists"
        );
    }

    #[test]
    fn test_provisioning_failed_preserves_source() {
        let err = SchemaError::provisioning(
            "tenant_1",
            SchemaError::Migration("bad up statement".to_string()),
        );
        assert!(err.to_string().contains("tenant_1"));
        assert!(err.to_string().contains("bad up statement"));

        let source = std::error::Error::source(&err).expect("source must be preserved");
        assert!(source.to_string().contains("bad up statement"));
    }

    #[test]
    fn test_non_database_errors_are_not_unique_violations() {
        assert!(!SchemaError::is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!SchemaError::is_unique_violation(&sqlx::Error::PoolClosed));
    }
}
