//! Schema name validation and identifier quoting
//!
//! Tenant names are interpolated into `CREATE SCHEMA` / `DROP SCHEMA`
//! statements, so every name is validated before its first use and quoted
//! at every interpolation site.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::error::SchemaError;

/// Characters allowed in schema identifiers (alphanumeric, underscore, dollar)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// SQL keywords rejected as schema names
static SQL_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "UNION", "DROP",
        "CREATE", "ALTER", "GRANT", "REVOKE", "TRUNCATE", "TABLE", "SCHEMA", "INDEX", "USER",
        "SESSION_USER", "CURRENT_USER", "CAST", "EXECUTE", "PUBLIC",
    ]
    .into_iter()
    .collect()
});

/// Quote an identifier for safe use in SQL
///
/// Escapes any embedded double quotes by doubling them, then wraps the
/// identifier in double quotes.
pub fn quote_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Validate that a tenant name is usable as a PostgreSQL schema name
///
/// # Returns
/// * Ok(()) if valid, Err(SchemaError::InvalidName) otherwise
pub fn validate_schema_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::InvalidName(
            "schema name cannot be empty".to_string(),
        ));
    }

    // PostgreSQL identifier limit is 63 bytes
    if name.len() > 63 {
        return Err(SchemaError::InvalidName(format!(
            "schema name '{}' is too long (max 63 characters)",
            name
        )));
    }

    for c in name.chars() {
        if !ALLOWED_IDENTIFIER_CHARS.contains(c) {
            return Err(SchemaError::InvalidName(format!(
                "schema name '{}' contains invalid character '{}'",
                name, c
            )));
        }
    }

    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(SchemaError::InvalidName(format!(
            "schema name '{}' cannot start with a number",
            name
        )));
    }

    // pg_* schemas are reserved by the server
    if name.to_lowercase().starts_with("pg_") {
        return Err(SchemaError::InvalidName(format!(
            "schema name '{}' uses the reserved pg_ prefix",
            name
        )));
    }

    if SQL_KEYWORDS.contains(name.to_uppercase().as_str()) {
        return Err(SchemaError::InvalidName(format!(
            "schema name '{}' is a reserved SQL keyword",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("tenant_1"), "\"tenant_1\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_valid_schema_names() {
        assert!(validate_schema_name("tenant_1").is_ok());
        assert!(validate_schema_name("_staging").is_ok());
        assert!(validate_schema_name("acme$corp").is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(validate_schema_name("").is_err());
    }

    #[test]
    fn test_overlong_name_rejected() {
        let name = "a".repeat(64);
        assert!(validate_schema_name(&name).is_err());
        assert!(validate_schema_name(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_invalid_characters_rejected() {
        assert!(validate_schema_name("tenant-1").is_err());
        assert!(validate_schema_name("tenant 1").is_err());
        assert!(validate_schema_name("tenant;drop").is_err());
        assert!(validate_schema_name("ten\"ant").is_err());
    }

    #[test]
    fn test_leading_digit_rejected() {
        assert!(validate_schema_name("1tenant").is_err());
    }

    #[test]
    fn test_reserved_names_rejected() {
        assert!(validate_schema_name("pg_catalog").is_err());
        assert!(validate_schema_name("PG_temp").is_err());
        assert!(validate_schema_name("select").is_err());
        assert!(validate_schema_name("public").is_err());
    }

    #[test]
    fn test_invalid_name_error_kind() {
        let err = validate_schema_name("bad name").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidName(_)));
    }
}
