//! In-memory cache of resolved schemas, keyed by schema name.
//!
//! The cache uses `arc-swap` so request handlers never block on a refresh.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use openapiv3::OpenAPI;
use thiserror::Error;

use super::resolver::resolve_encrypted_paths;

/// Errors from the schema cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The requested schema name has no entry in the cache.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),
}

/// A single cached entry.
#[derive(Debug, Clone)]
pub struct CachedSchema {
    /// Sorted attribute paths marked `x-encrypted: true`.
    pub attributes: Arc<[String]>,
}

/// Shared, lock-free cache of schemas keyed by schema name.
#[derive(Clone, Debug)]
pub struct SchemaCache {
    inner: Arc<ArcSwap<HashMap<String, CachedSchema>>>,
}

impl SchemaCache {
    /// Create a new, empty [`SchemaCache`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Number of schemas currently cached.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Returns `true` if no schemas are cached.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Look up a schema by name.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnknownSchema`] if `name` is not present.
    pub fn get(&self, name: &str) -> Result<CachedSchema, CacheError> {
        self.inner
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownSchema(name.to_owned()))
    }

    /// Atomically replace the entire schema map, resolving attribute paths
    /// for each document.
    pub fn replace_all(&self, schemas: HashMap<String, OpenAPI>) {
        let new_map: HashMap<String, CachedSchema> = schemas
            .into_iter()
            .map(|(name, api)| {
                let attributes = resolve_encrypted_paths(&api).into();
                (name, CachedSchema { attributes })
            })
            .collect();
        self.inner.store(Arc::new(new_map));
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_with_secret() -> OpenAPI {
        serde_json::from_value(serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "components": {"schemas": {"S": {
                "type": "object",
                "properties": {"secret": {"type": "string", "x-encrypted": true}}
            }}}
        }))
        .unwrap()
    }

    #[test]
    fn initially_empty() {
        let cache = SchemaCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert!(matches!(
            cache.get("nonexistent"),
            Err(CacheError::UnknownSchema(name)) if name == "nonexistent"
        ));
    }

    #[test]
    fn replace_all_resolves_attributes() {
        let cache = SchemaCache::new();
        cache.replace_all(HashMap::from([("customers".to_owned(), api_with_secret())]));
        assert_eq!(cache.len(), 1);
        let entry = cache.get("customers").unwrap();
        assert_eq!(&*entry.attributes, ["secret".to_owned()]);
    }

    #[test]
    fn replace_all_drops_old_entries() {
        let cache = SchemaCache::new();
        cache.replace_all(HashMap::from([("a".to_owned(), api_with_secret())]));
        cache.replace_all(HashMap::from([("b".to_owned(), api_with_secret())]));
        assert!(cache.get("a").is_err());
        assert!(cache.get("b").is_ok());
    }
}
