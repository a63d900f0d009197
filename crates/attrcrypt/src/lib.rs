//! Field-level encryption of selected record attributes.
//!
//! Each encrypted attribute is replaced by a self-describing envelope string
//! that records the key id it was sealed under and, optionally, the identity of
//! the record it belongs to:
//!
//! ```text
//! base64(aad)$base64(nonce)$base64(ciphertext)$base64(tag, unpadded)
//! ```
//!
//! ```
//! use attrcrypt::{EncryptedAttributes, EncryptionConfig, IdentityBinding};
//! use serde_json::json;
//!
//! let config = EncryptionConfig::new(
//!     [("k1", "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=")],
//!     "k1",
//!     IdentityBinding::default_attribute(),
//! )?;
//! let codec = EncryptedAttributes::new(["secret"], config);
//!
//! let mut record = json!({"id": "u1", "secret": "hello"});
//! codec.encrypt_all(&mut record)?;
//! assert!(attrcrypt::is_envelope(record["secret"].as_str().unwrap()));
//! codec.decrypt_all(&mut record)?;
//! assert_eq!(record["secret"], "hello");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module layout
//!
//! - [`crypto`]: AES-256-GCM with a detached tag. No knowledge of envelopes.
//! - [`envelope`]: envelope format, associated data, `encode` / `decode`.
//! - [`codec`]: [`EncryptedAttributes`], the per-record orchestrator.
//! - [`path`]: dot-notation get/set over `serde_json::Value`.
//! - [`config`], [`keys`]: validated configuration and key material.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod path;

pub use codec::EncryptedAttributes;
pub use config::{EncryptionConfig, EncryptionSettings, IdentityBinding};
pub use envelope::is_envelope;
pub use error::{AttrError, ConfigError};
pub use keys::{KeyRing, SecretKey};
