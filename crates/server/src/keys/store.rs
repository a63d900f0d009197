//! [`KeyStore`]: lock-free holder of the current encryption configuration.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use attrcrypt::EncryptionConfig;
use thiserror::Error;

/// Errors produced by the key store.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key file has been loaded yet.
    #[error("encryption keys not yet initialised")]
    NotInitialised,
}

/// Thread-safe store for the current [`EncryptionConfig`].
///
/// Rotation swaps in a whole new configuration; a configuration is never
/// mutated in place. Readers that already hold a snapshot keep using it until
/// they drop it.
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    inner: Arc<ArcSwapOption<EncryptionConfig>>,
}

impl KeyStore {
    /// Create a new, empty [`KeyStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a configuration is currently loaded.
    pub fn is_ready(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Store (or replace) the current configuration.
    pub fn store(&self, config: EncryptionConfig) {
        self.inner.store(Some(Arc::new(config)));
    }

    /// Snapshot of the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::NotInitialised`] if nothing has been stored yet.
    pub fn current(&self) -> Result<Arc<EncryptionConfig>, KeyStoreError> {
        self.inner.load_full().ok_or(KeyStoreError::NotInitialised)
    }

    /// Key id used for new encryptions, if a configuration is loaded.
    pub fn current_key_id(&self) -> Option<String> {
        self.current()
            .ok()
            .map(|cfg| cfg.current_key_id().to_owned())
    }
}
