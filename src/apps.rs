//! Application registry
//!
//! The set of application modules whose tables live per tenant schema is an
//! explicit input to the provisioner rather than a process-wide registry.
//! Each `App` carries the SQL for its initial table sync and, optionally, a
//! directory of migration files.

use std::path::{Path, PathBuf};

/// An application module provisioned into every tenant schema
#[derive(Debug, Clone)]
pub struct App {
    pub name: String,
    /// SQL executed during the sync phase to create the app's initial tables
    pub sync_sql: Option<String>,
    /// Directory holding the app's `.sql` migration files
    pub migrations_dir: Option<PathBuf>,
}

impl App {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sync_sql: None,
            migrations_dir: None,
        }
    }

    pub fn with_sync_sql(mut self, sql: &str) -> Self {
        self.sync_sql = Some(sql.to_string());
        self
    }

    pub fn with_migrations_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.migrations_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Whether the app has migration history (at least one `.sql` file)
    pub fn has_migrations(&self) -> bool {
        let Some(dir) = &self.migrations_dir else {
            return false;
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            return false;
        };
        entries
            .flatten()
            .any(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
    }
}

/// Explicit list of apps eligible for per-schema provisioning
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: Vec<App>,
}

impl AppRegistry {
    pub fn new(apps: Vec<App>) -> Self {
        Self { apps }
    }

    pub fn register(&mut self, app: App) {
        tracing::debug!(app = %app.name, "registering isolated app");
        self.apps.push(app);
    }

    /// All registered apps, i.e. the per-schema ("isolated") set
    pub fn isolated(&self) -> &[App] {
        &self.apps
    }

    /// Apps with migration history, in registration order
    pub fn migration_candidates(&self) -> Vec<App> {
        self.apps
            .iter()
            .filter(|app| app.has_migrations())
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&App> {
        self.apps.iter().find(|app| app.name == name)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
