//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::keys::KeyStore;
use crate::schema::SchemaCache;

/// Application state shared across all request handlers.
///
/// Every field is `Arc`-backed, so Axum's per-request clone is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Current encryption configuration, swapped on key reload.
    pub key_store: KeyStore,
    /// Lock-free cache of resolved schemas.
    pub schema_cache: SchemaCache,
    /// Name of the HTTP header used to identify the schema for each request.
    pub schema_header_name: Arc<String>,
}

impl AppState {
    /// Create a new [`AppState`] with the provided stores and header name.
    pub fn new(key_store: KeyStore, schema_cache: SchemaCache, schema_header_name: String) -> Self {
        Self {
            key_store,
            schema_cache,
            schema_header_name: Arc::new(schema_header_name),
        }
    }
}

impl Default for AppState {
    /// Empty stores and the default header name, suitable for tests.
    fn default() -> Self {
        Self::new(KeyStore::new(), SchemaCache::new(), "X-Schema-Name".into())
    }
}
