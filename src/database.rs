//! Database connectivity - PostgreSQL connection pool construction
//!
//! Provides pool configuration and creation helpers used by the provisioner
//! and the per-schema migration runner.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::{SchemaError, SchemaResult};

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
    pub idle_timeout: Option<u64>,
    pub max_lifetime: Option<u64>,
    pub test_before_acquire: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: 30,
            idle_timeout: Some(600),  // 10 minutes
            max_lifetime: Some(1800), // 30 minutes
            test_before_acquire: true,
        }
    }
}

impl PoolConfig {
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = min_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout_seconds: u64) -> Self {
        self.acquire_timeout = timeout_seconds;
        self
    }

    pub fn with_idle_timeout(mut self, timeout_seconds: Option<u64>) -> Self {
        self.idle_timeout = timeout_seconds;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime_seconds: Option<u64>) -> Self {
        self.max_lifetime = lifetime_seconds;
        self
    }

    pub fn with_test_before_acquire(mut self, enabled: bool) -> Self {
        self.test_before_acquire = enabled;
        self
    }
}

/// Create a database pool with default configuration
pub async fn create_pool(database_url: &str) -> SchemaResult<PgPool> {
    create_pool_with_config(database_url, &PoolConfig::default()).await
}

/// Create a database pool with custom configuration
pub async fn create_pool_with_config(
    database_url: &str,
    config: &PoolConfig,
) -> SchemaResult<PgPool> {
    tracing::debug!(
        "Creating database pool: max={}, min={}, timeout={}s, idle_timeout={:?}s, max_lifetime={:?}s, test_before_acquire={}",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout,
        config.idle_timeout,
        config.max_lifetime,
        config.test_before_acquire
    );

    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .test_before_acquire(config.test_before_acquire);

    if let Some(idle_timeout) = config.idle_timeout {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    if let Some(max_lifetime) = config.max_lifetime {
        options = options.max_lifetime(Duration::from_secs(max_lifetime));
    }

    let pool = options.connect(database_url).await.map_err(|e| {
        tracing::error!("Failed to create database pool: {}", e);
        SchemaError::Database(e)
    })?;

    tracing::info!(
        "Database pool created with {} max connections",
        config.max_connections
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout, 30);
        assert_eq!(config.idle_timeout, Some(600));
        assert_eq!(config.max_lifetime, Some(1800));
        assert!(config.test_before_acquire);
    }

    #[test]
    fn test_pool_config_fluent_configuration() {
        let config = PoolConfig::default()
            .with_max_connections(20)
            .with_min_connections(5)
            .with_acquire_timeout(60)
            .with_idle_timeout(None)
            .with_max_lifetime(Some(900))
            .with_test_before_acquire(false);

        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.acquire_timeout, 60);
        assert_eq!(config.idle_timeout, None);
        assert_eq!(config.max_lifetime, Some(900));
        assert!(!config.test_before_acquire);
    }
}
