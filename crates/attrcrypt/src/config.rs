//! Validated encryption configuration.
//!
//! An [`EncryptionConfig`] is immutable once built. Key rotation builds a new
//! configuration and swaps it in; nothing mutates a configuration in place.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::keys::{KeyRing, SecretKey};

/// Attribute read when identity binding is enabled without an explicit name.
pub const DEFAULT_IDENTITY_ATTRIBUTE: &str = "id";

/// Whether envelopes are bound to the identity of the record they live on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityBinding {
    /// Envelopes carry an empty identity and can be decrypted on any record.
    #[default]
    Off,
    /// Envelopes carry the value of the named attribute and only decrypt on a
    /// record with the same value.
    Bound(String),
}

impl IdentityBinding {
    /// Bind to the default `"id"` attribute.
    pub fn default_attribute() -> Self {
        IdentityBinding::Bound(DEFAULT_IDENTITY_ATTRIBUTE.to_owned())
    }

    /// Parse a textual setting.
    ///
    /// `""`, `"off"` and `"false"` disable binding; `"on"` and `"true"` bind to
    /// `"id"`; anything else names the attribute to bind to.
    pub fn parse(setting: &str) -> Self {
        match setting.trim() {
            "" | "off" | "false" => IdentityBinding::Off,
            "on" | "true" => Self::default_attribute(),
            attribute => IdentityBinding::Bound(attribute.to_owned()),
        }
    }

    /// Name of the bound attribute, if binding is enabled.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            IdentityBinding::Off => None,
            IdentityBinding::Bound(attribute) => Some(attribute),
        }
    }
}

impl<'de> Deserialize<'de> for IdentityBinding {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Setting {
            Flag(bool),
            Attribute(String),
        }

        Ok(match Option::<Setting>::deserialize(deserializer)? {
            None | Some(Setting::Flag(false)) => IdentityBinding::Off,
            Some(Setting::Flag(true)) => IdentityBinding::default_attribute(),
            Some(Setting::Attribute(s)) => IdentityBinding::parse(&s),
        })
    }
}

/// Serialisable form of an [`EncryptionConfig`], with keys still base64-encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionSettings {
    /// Key id → base64-encoded 32-byte key.
    pub keys: HashMap<String, String>,
    /// Key id used for new encryptions.
    pub current_key_id: String,
    /// Identity binding setting; absent means off.
    #[serde(default)]
    pub identity_binding: IdentityBinding,
}

/// Immutable, validated configuration for encrypting and decrypting attributes.
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    keys: KeyRing,
    current_key_id: String,
    current_key: SecretKey,
    identity_binding: IdentityBinding,
}

impl EncryptionConfig {
    /// Build a configuration from base64 keys.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the key map is empty, any key id or key is
    /// malformed, `current_key_id` is not in the map, or identity binding names
    /// an empty attribute.
    pub fn new<I, K, V>(
        keys: I,
        current_key_id: impl Into<String>,
        identity_binding: IdentityBinding,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        Self::with_key_ring(KeyRing::from_base64(keys)?, current_key_id, identity_binding)
    }

    /// Build a configuration from an already-decoded [`KeyRing`].
    ///
    /// # Errors
    ///
    /// As [`EncryptionConfig::new`], minus key decoding.
    pub fn with_key_ring(
        keys: KeyRing,
        current_key_id: impl Into<String>,
        identity_binding: IdentityBinding,
    ) -> Result<Self, ConfigError> {
        let current_key_id = current_key_id.into();
        if keys.is_empty() {
            return Err(ConfigError::NoKeys);
        }
        let current_key = match keys.get(&current_key_id) {
            Some(key) => key.clone(),
            None => return Err(ConfigError::UnknownCurrentKey(current_key_id)),
        };
        if let IdentityBinding::Bound(attribute) = &identity_binding {
            if attribute.trim().is_empty() {
                return Err(ConfigError::EmptyIdentityAttribute);
            }
        }
        Ok(Self {
            keys,
            current_key_id,
            current_key,
            identity_binding,
        })
    }

    /// All keys that may be used for decryption.
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Key id used for new encryptions.
    pub fn current_key_id(&self) -> &str {
        &self.current_key_id
    }

    /// Key used for new encryptions.
    pub fn current_key(&self) -> &SecretKey {
        &self.current_key
    }

    /// Identity binding mode.
    pub fn identity_binding(&self) -> &IdentityBinding {
        &self.identity_binding
    }
}

impl TryFrom<EncryptionSettings> for EncryptionConfig {
    type Error = ConfigError;

    fn try_from(settings: EncryptionSettings) -> Result<Self, Self::Error> {
        Self::new(
            settings.keys,
            settings.current_key_id,
            settings.identity_binding,
        )
    }
}
