//! Error types for attribute encryption.
//!
//! Callers branch on the variant, never on the message text. Messages name
//! attributes and key ids but never carry plaintext, identities or key bytes.

use thiserror::Error;

use crate::path::PathError;

/// Failures of the envelope codec and the batch orchestrator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttrError {
    /// Attempted to encrypt a value that is neither a string nor null.
    #[error("encrypted attribute must be a string, found {found}")]
    TypeMismatch {
        /// JSON type name of the rejected value.
        found: &'static str,
    },

    /// Identity binding is enabled but the record has no usable identity value.
    #[error("cannot process encrypted attribute without '{attribute}'")]
    MissingIdentity {
        /// Name of the identity attribute that was looked up.
        attribute: String,
    },

    /// The envelope is bound to a different record identity.
    #[error("encrypted attribute is bound to a different record identity")]
    IdentityMismatch,

    /// The envelope names a key id that is not in the current key map.
    #[error("encrypted attribute references unknown key id '{0}'")]
    UnknownKey(String),

    /// The envelope is malformed or failed AEAD authentication.
    #[error("encrypted attribute failed integrity check")]
    IntegrityFailure,

    /// The decrypted value could not be written back into the record.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Failures validating an [`EncryptionConfig`](crate::config::EncryptionConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The key map is empty.
    #[error("at least one key is required")]
    NoKeys,

    /// A key id is empty or contains the `$` envelope delimiter.
    #[error("invalid key id '{0}': must be non-empty and must not contain '$'")]
    InvalidKeyId(String),

    /// A key is not valid base64 or does not decode to 32 bytes.
    #[error("key '{key_id}' is invalid: {reason}")]
    InvalidKey {
        /// Id of the rejected key.
        key_id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `current_key_id` does not name a key in the key map.
    #[error("current key id '{0}' is not present in keys")]
    UnknownCurrentKey(String),

    /// Identity binding was enabled with an empty attribute name.
    #[error("identity binding attribute must not be empty")]
    EmptyIdentityAttribute,
}
