//! Encryption key loading, caching, and background reload.
//!
//! # Lifecycle
//!
//! 1. At startup, [`load_and_store`] reads the key file, validates it into an
//!    [`EncryptionConfig`], and seeds the [`KeyStore`].
//! 2. A background Tokio task spawned by [`reload_task`] re-reads the file on a
//!    configurable interval. Operators rotate keys by adding a new key to the
//!    file and pointing `current_key_id` at it; old keys stay in the file for as
//!    long as envelopes sealed under them must remain readable.
//! 3. Handlers take an `Arc` snapshot via [`KeyStore::current`].
//!
//! # Key file
//!
//! ```json
//! {
//!   "current_key_id": "k2",
//!   "keys": { "k1": "<base64 32 bytes>", "k2": "<base64 32 bytes>" },
//!   "identity_binding": "id"
//! }
//! ```
//!
//! # Security invariants
//!
//! - Key material is never logged or included in traces; only key ids are.

pub mod store;

pub use store::KeyStore;

use std::path::Path;

use anyhow::{Context, Result};
use attrcrypt::{EncryptionConfig, EncryptionSettings};
use tokio::time;
use tracing::{info, warn};

use crate::config::Config;

/// Parse and validate the contents of a key file.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON of the expected shape or if
/// the keys fail validation.
pub fn parse_key_file(text: &str) -> Result<EncryptionConfig> {
    let settings: EncryptionSettings =
        serde_json::from_str(text).context("key file is not valid JSON of the expected shape")?;
    EncryptionConfig::try_from(settings).context("key file failed validation")
}

/// Read and validate the key file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails [`parse_key_file`].
pub async fn load_key_file(path: impl AsRef<Path>) -> Result<EncryptionConfig> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    parse_key_file(&text).with_context(|| format!("invalid key file {}", path.display()))
}

/// Load the configured key file and store it as the current configuration.
///
/// # Errors
///
/// Returns an error if the key file cannot be loaded; the store is left as it was.
pub async fn load_and_store(cfg: &Config, store: &KeyStore) -> Result<()> {
    let encryption = load_key_file(&cfg.keys_file).await?;
    let mut key_ids: Vec<&str> = encryption.keys().key_ids().collect();
    key_ids.sort_unstable();
    info!(
        current_key_id = %encryption.current_key_id(),
        key_ids = ?key_ids,
        identity_binding = encryption.identity_binding().attribute().unwrap_or("off"),
        "encryption keys loaded"
    );
    store.store(encryption);
    Ok(())
}

/// Spawn a background task that periodically reloads the key file.
///
/// The first reload fires after one full interval (startup load is assumed to
/// have already populated the store). On failure the previous configuration is
/// retained and a warning is emitted.
pub fn reload_task(cfg: Config, store: KeyStore) -> tokio::task::JoinHandle<()> {
    let interval = std::time::Duration::from_secs(cfg.key_reload_interval_secs);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; skip it so we don't double-load.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = load_and_store(&cfg, &store).await {
                warn!(error = %format!("{e:#}"), "key reload failed; retaining previous keys");
            }
        }
    })
}
