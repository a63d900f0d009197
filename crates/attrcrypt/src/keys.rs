//! [`SecretKey`] and [`KeyRing`]: validated symmetric key material.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;
use crate::error::ConfigError;

/// Fixed-size buffer that holds exactly [`KEY_LEN`] bytes of key material.
///
/// The bytes are overwritten with zeroes when the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Build a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] if `bytes` is not [`KEY_LEN`] long.
    pub fn from_bytes(key_id: &str, bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() != KEY_LEN {
            return Err(ConfigError::InvalidKey {
                key_id: key_id.to_owned(),
                reason: format!("expected {KEY_LEN} bytes, got {}", bytes.len()),
            });
        }
        let mut buf = [0u8; KEY_LEN];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Decode a standard-base64 key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] if `encoded` is not base64 or does
    /// not decode to [`KEY_LEN`] bytes.
    pub fn from_base64(key_id: &str, encoded: &str) -> Result<Self, ConfigError> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::InvalidKey {
                key_id: key_id.to_owned(),
                reason: format!("not valid base64: {e}"),
            })?;
        let key = Self::from_bytes(key_id, &bytes);
        bytes.zeroize();
        key
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Mapping from key id to key material.
///
/// Key ids are non-empty and never contain `$`, so they can be recovered
/// unambiguously from an envelope's associated data.
#[derive(Clone, Debug, Default)]
pub struct KeyRing {
    keys: HashMap<String, SecretKey>,
}

impl KeyRing {
    /// Decode and validate a map of base64 keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoKeys`] for an empty map, and
    /// [`ConfigError::InvalidKeyId`] / [`ConfigError::InvalidKey`] for the first
    /// bad entry.
    pub fn from_base64<I, K, V>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut keys = HashMap::new();
        for (key_id, encoded) in entries {
            let key_id = key_id.into();
            validate_key_id(&key_id)?;
            let key = SecretKey::from_base64(&key_id, encoded.as_ref())?;
            keys.insert(key_id, key);
        }
        if keys.is_empty() {
            return Err(ConfigError::NoKeys);
        }
        Ok(Self { keys })
    }

    /// Look up a key by id.
    pub fn get(&self, key_id: &str) -> Option<&SecretKey> {
        self.keys.get(key_id)
    }

    /// Returns `true` if `key_id` is present.
    pub fn contains(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    /// Number of keys in the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate over the key ids, in no particular order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

fn validate_key_id(key_id: &str) -> Result<(), ConfigError> {
    if key_id.is_empty() || key_id.contains('$') {
        return Err(ConfigError::InvalidKeyId(key_id.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(byte: u8, len: usize) -> String {
        STANDARD.encode(vec![byte; len])
    }

    #[test]
    fn decodes_valid_keys() {
        let ring = KeyRing::from_base64([("k1", encoded(1, KEY_LEN)), ("k2", encoded(2, KEY_LEN))])
            .unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.get("k1").unwrap().as_bytes(), &[1u8; KEY_LEN][..]);
        assert!(ring.contains("k2"));
        assert!(!ring.contains("k3"));
    }

    #[test]
    fn key_ids_lists_every_key() {
        let ring = KeyRing::from_base64([("k1", encoded(1, KEY_LEN)), ("k2", encoded(2, KEY_LEN))])
            .unwrap();
        let mut ids: Vec<&str> = ring.key_ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, ["k1", "k2"]);
    }

    #[test]
    fn rejects_empty_map() {
        let entries: Vec<(String, String)> = Vec::new();
        assert_eq!(KeyRing::from_base64(entries).unwrap_err(), ConfigError::NoKeys);
    }

    #[test]
    fn rejects_short_key() {
        let err = KeyRing::from_base64([("k1", encoded(1, 16))]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey { ref key_id, .. } if key_id == "k1"));
    }

    #[test]
    fn rejects_bad_base64() {
        let err = KeyRing::from_base64([("k1", "not base64!!")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey { .. }));
    }

    #[test]
    fn rejects_delimiter_in_key_id() {
        let err = KeyRing::from_base64([("k$1", encoded(1, KEY_LEN))]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidKeyId("k$1".into()));
        let err = KeyRing::from_base64([("", encoded(1, KEY_LEN))]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidKeyId(String::new()));
    }

    #[test]
    fn secret_key_redacted_in_debug() {
        let key = SecretKey::from_bytes("k1", &[0xFF; KEY_LEN]).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
        let ring = KeyRing::from_base64([("k1", encoded(0xAB, KEY_LEN))]).unwrap();
        assert!(!format!("{ring:?}").contains("171"));
    }
}
