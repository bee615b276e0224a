//! Schema-routing path cache
//!
//! Request routing resolves a tenant's `search_path` on every lookup; the
//! cache memoizes those strings. Provisioning and teardown invalidate it
//! explicitly so routing never serves a stale schema set. The cache is an
//! injected trait object, not process-global state.

use dashmap::DashMap;

use crate::security::quote_identifier;

/// Cache of per-tenant search paths with explicit invalidation
pub trait SchemaPathCache: Send + Sync {
    /// Resolve (and memoize) the search path for a tenant schema
    fn search_path(&self, schema: &str) -> String;

    /// Drop the cached path for one schema
    fn invalidate(&self, schema: &str);

    /// Drop every cached path
    fn reset_path(&self);
}

/// In-memory path cache backed by a concurrent map
pub struct InMemoryPathCache {
    paths: DashMap<String, String>,
    /// Shared schema appended after the tenant schema, usually "public"
    shared_schema: String,
}

impl InMemoryPathCache {
    pub fn new() -> Self {
        Self::with_shared_schema("public")
    }

    pub fn with_shared_schema(shared_schema: &str) -> Self {
        Self {
            paths: DashMap::new(),
            shared_schema: shared_schema.to_string(),
        }
    }

    /// Number of cached paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn compute_path(&self, schema: &str) -> String {
        format!(
            "{}, {}",
            quote_identifier(schema),
            quote_identifier(&self.shared_schema)
        )
    }
}

impl Default for InMemoryPathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaPathCache for InMemoryPathCache {
    fn search_path(&self, schema: &str) -> String {
        if let Some(path) = self.paths.get(schema) {
            return path.clone();
        }
        let path = self.compute_path(schema);
        self.paths.insert(schema.to_string(), path.clone());
        path
    }

    fn invalidate(&self, schema: &str) {
        self.paths.remove(schema);
    }

    fn reset_path(&self) {
        tracing::debug!("resetting schema path cache");
        self.paths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_includes_tenant_and_shared_schema() {
        let cache = InMemoryPathCache::new();
        assert_eq!(cache.search_path("tenant_1"), "\"tenant_1\", \"public\"");
    }

    #[test]
    fn test_search_path_is_memoized() {
        let cache = InMemoryPathCache::new();
        cache.search_path("tenant_1");
        cache.search_path("tenant_1");
        cache.search_path("tenant_2");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_single_schema() {
        let cache = InMemoryPathCache::new();
        cache.search_path("tenant_1");
        cache.search_path("tenant_2");
        cache.invalidate("tenant_1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let cache = InMemoryPathCache::new();
        cache.search_path("tenant_1");
        cache.search_path("tenant_2");
        cache.reset_path();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_custom_shared_schema() {
        let cache = InMemoryPathCache::with_shared_schema("shared");
        assert_eq!(cache.search_path("tenant_1"), "\"tenant_1\", \"shared\"");
    }
}
