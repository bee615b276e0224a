//! Migration file loading and parsing
//!
//! Reads an app's migration directory, parses `-- up` / `-- down` sections,
//! and splits SQL into individual statements for execution.

use chrono::{DateTime, Utc};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::fs;
use std::path::Path;

use super::definitions::{Migration, MigrationConfig};
use crate::error::{SchemaError, SchemaResult};

/// Loads and parses migration files
#[derive(Debug, Clone)]
pub struct MigrationManager {
    config: MigrationConfig,
}

impl MigrationManager {
    pub fn new() -> Self {
        Self::with_config(MigrationConfig::default())
    }

    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Load all migrations from a directory, sorted by id
    pub fn load_migrations(&self, dir: &Path) -> SchemaResult<Vec<Migration>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut migrations = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::Migration(format!("Failed to read migrations directory: {}", e))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::Migration(format!("Failed to read directory entry: {}", e))
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                migrations.push(self.parse_migration_file(&path)?);
            }
        }

        // Timestamp-prefixed ids sort chronologically
        migrations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(migrations)
    }

    fn parse_migration_file(&self, path: &Path) -> SchemaResult<Migration> {
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::Migration(format!("Failed to read migration file: {}", e)))?;

        let filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SchemaError::Migration("Invalid migration filename".to_string()))?;

        // Filename format: YYYYMMDD_HHMMSS_name or timestamp_name
        let parts: Vec<&str> = filename.split('_').collect();
        if parts.len() < 2 {
            return Err(SchemaError::Migration(
                "Migration filename must follow format: timestamp_name".to_string(),
            ));
        }

        let id = filename.to_string();
        let name = if parts.len() >= 3 && parts[0].len() == 8 && parts[1].len() == 6 {
            parts[2..].join(" ")
        } else {
            parts[1..].join(" ")
        };

        let (up_sql, down_sql) = self.parse_migration_content(&content);

        let created_at = self
            .parse_migration_timestamp(parts[0])
            .unwrap_or_else(Utc::now);

        Ok(Migration {
            id,
            name,
            up_sql,
            down_sql,
            created_at,
        })
    }

    /// Extract UP and DOWN SQL from migration content
    fn parse_migration_content(&self, content: &str) -> (String, String) {
        let mut up_sql = Vec::new();
        let mut down_sql = Vec::new();
        let mut current_section = "";

        for line in content.lines() {
            let trimmed = line.trim().to_lowercase();

            if trimmed.starts_with("-- up") {
                current_section = "up";
                continue;
            } else if trimmed.starts_with("-- down") {
                current_section = "down";
                continue;
            }

            if line.trim().is_empty() || line.trim().starts_with("--") {
                continue;
            }

            match current_section {
                "up" => up_sql.push(line),
                "down" => down_sql.push(line),
                _ => {} // before any section marker
            }
        }

        (
            up_sql.join("\n").trim().to_string(),
            down_sql.join("\n").trim().to_string(),
        )
    }

    fn parse_migration_timestamp(&self, timestamp_str: &str) -> Option<DateTime<Utc>> {
        // get() rather than slicing: byte 8 may not be a char boundary in an
        // oddly named file, and a filename must never panic the migrate phase
        let prefix = timestamp_str.get(..8)?;
        let formatted = format!("{}000000", prefix);
        let naive = chrono::NaiveDateTime::parse_from_str(&formatted, "%Y%m%d%H%M%S").ok()?;
        Some(DateTime::from_naive_utc_and_offset(naive, Utc))
    }

    /// Split SQL into individual statements using proper SQL parsing
    pub fn split_sql_statements(&self, sql: &str) -> SchemaResult<Vec<String>> {
        let dialect = GenericDialect {};

        match Parser::parse_sql(&dialect, sql) {
            Ok(parsed_statements) => Ok(parsed_statements
                .into_iter()
                .map(|stmt| format!("{};", stmt))
                .collect()),
            Err(e) => {
                // Postgres-specific syntax the generic dialect rejects still
                // has to run; fall back to semicolon splitting.
                tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
                Ok(sql
                    .split(';')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("{};", s))
                    .collect())
            }
        }
    }
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_migration(dir: &Path, filename: &str, content: &str) {
        fs::write(dir.join(filename), content).unwrap();
    }

    #[test]
    fn test_missing_directory_yields_no_migrations() {
        let manager = MigrationManager::new();
        let migrations = manager
            .load_migrations(Path::new("/nonexistent/migrations"))
            .unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_load_migrations_sorted_by_id() {
        let dir = TempDir::new().unwrap();
        write_migration(
            dir.path(),
            "20240201_000000_add_index.sql",
            "-- up\nCREATE INDEX idx ON posts (title);\n-- down\nDROP INDEX idx;\n",
        );
        write_migration(
            dir.path(),
            "20240101_000000_create_posts.sql",
            "-- up\nCREATE TABLE posts (id INT);\n-- down\nDROP TABLE posts;\n",
        );

        let manager = MigrationManager::new();
        let migrations = manager.load_migrations(dir.path()).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].id, "20240101_000000_create_posts");
        assert_eq!(migrations[0].name, "create posts");
        assert_eq!(migrations[1].id, "20240201_000000_add_index");
    }

    #[test]
    fn test_parse_up_and_down_sections() {
        let manager = MigrationManager::new();
        let content = "-- Migration: create posts\n\
                       -- up\n\
                       CREATE TABLE posts (id INT);\n\n\
                       -- down\n\
                       DROP TABLE posts;\n";
        let (up, down) = manager.parse_migration_content(content);
        assert_eq!(up, "CREATE TABLE posts (id INT);");
        assert_eq!(down, "DROP TABLE posts;");
    }

    #[test]
    fn test_content_before_section_marker_is_ignored() {
        let manager = MigrationManager::new();
        let (up, down) = manager.parse_migration_content("SELECT 1;\n-- up\nSELECT 2;\n");
        assert_eq!(up, "SELECT 2;");
        assert_eq!(down, "");
    }

    #[test]
    fn test_invalid_filename_rejected() {
        let dir = TempDir::new().unwrap();
        write_migration(dir.path(), "noformat.sql", "-- up\nSELECT 1;\n");

        let manager = MigrationManager::new();
        let err = manager.load_migrations(dir.path()).unwrap_err();
        assert!(matches!(err, SchemaError::Migration(_)));
    }

    #[test]
    fn test_split_sql_statements() {
        let manager = MigrationManager::new();
        let statements = manager
            .split_sql_statements("CREATE TABLE a (id INT); CREATE TABLE b (id INT)")
            .unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE a"));
        assert!(statements[1].ends_with(";"));
    }

    #[test]
    fn test_split_falls_back_on_unparsable_sql() {
        let manager = MigrationManager::new();
        // CREATE EXTENSION is not generic SQL; the fallback must still split it
        let statements = manager
            .split_sql_statements("CREATE EXTENSION pgcrypto; SELECT 1")
            .unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_non_ascii_filename_loads_without_panicking() {
        let dir = TempDir::new().unwrap();
        // byte 8 of the first segment falls inside a multi-byte character
        write_migration(dir.path(), "aééééb_init.sql", "-- up\nSELECT 1;\n");

        let manager = MigrationManager::new();
        let migrations = manager.load_migrations(dir.path()).unwrap();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].name, "init");
        // unparsable timestamp falls back to load time
        assert!(migrations[0].created_at <= Utc::now());
    }

    #[test]
    fn test_short_timestamp_segment_falls_back_to_now() {
        let manager = MigrationManager::new();
        assert!(manager.parse_migration_timestamp("202401").is_none());
        assert!(manager.parse_migration_timestamp("notadate").is_none());
        assert!(manager.parse_migration_timestamp("20240315").is_some());
    }

    #[test]
    fn test_timestamp_parsed_from_filename() {
        let dir = TempDir::new().unwrap();
        write_migration(
            dir.path(),
            "20240315_120000_create_posts.sql",
            "-- up\nCREATE TABLE posts (id INT);\n",
        );

        let manager = MigrationManager::new();
        let migrations = manager.load_migrations(dir.path()).unwrap();
        assert_eq!(
            migrations[0].created_at.format("%Y%m%d").to_string(),
            "20240315"
        );
    }
}
