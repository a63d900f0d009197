//! [`EncryptedAttributes`]: apply the envelope codec to a fixed list of
//! attribute paths on a record.
//!
//! Batch operations are not atomic. If an attribute fails part-way through the
//! list, the attributes before it stay mutated on the record. Callers needing
//! all-or-nothing semantics should work on a clone and swap it in on success.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::config::EncryptionConfig;
use crate::envelope;
use crate::error::AttrError;
use crate::path;

/// Per-attribute transformation used by the batch walkers.
type AttributeOp = fn(&EncryptedAttributes, &Value, Value) -> Result<Value, AttrError>;

/// Encrypts and decrypts a configured, ordered set of attributes on records.
///
/// Immutable once built and cheap to share across threads. Rotating keys means
/// building a new instance around a new [`EncryptionConfig`].
#[derive(Debug, Clone)]
pub struct EncryptedAttributes {
    attributes: Vec<String>,
    config: Arc<EncryptionConfig>,
}

impl EncryptedAttributes {
    /// Create an orchestrator for `attributes` (dot-notation paths, processed
    /// in the given order) under `config`.
    pub fn new<I, S>(attributes: I, config: impl Into<Arc<EncryptionConfig>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            config: config.into(),
        }
    }

    /// The configured attribute paths, in processing order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Encrypt one raw attribute value belonging to `record`.
    ///
    /// `null` and values that are already envelopes pass through unchanged.
    ///
    /// # Errors
    ///
    /// - [`AttrError::TypeMismatch`] if `value` is neither a string nor null.
    /// - [`AttrError::MissingIdentity`] if identity binding is on and `record`
    ///   has no usable identity value.
    pub fn encrypt_attribute(&self, record: &Value, value: Value) -> Result<Value, AttrError> {
        let plaintext = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) if envelope::is_envelope(&s) => return Ok(Value::String(s)),
            Value::String(s) => s,
            other => {
                return Err(AttrError::TypeMismatch {
                    found: json_type_name(&other),
                })
            }
        };

        let identity = self.bound_identity(record)?;
        envelope::encode(
            &plaintext,
            self.config.current_key(),
            self.config.current_key_id(),
            identity.as_deref(),
        )
        .map(Value::String)
    }

    /// Decrypt one stored attribute value belonging to `record`.
    ///
    /// Anything that is not an envelope string passes through unchanged.
    ///
    /// # Errors
    ///
    /// [`AttrError::MissingIdentity`] when identity binding is on and the
    /// record has no identity, plus any error of [`envelope::decode`].
    pub fn decrypt_attribute(&self, record: &Value, value: Value) -> Result<Value, AttrError> {
        let stored = match value {
            Value::String(s) if envelope::is_envelope(&s) => s,
            other => return Ok(other),
        };

        let identity = self.bound_identity(record)?;
        envelope::decode(&stored, self.config.keys(), identity.as_deref()).map(Value::String)
    }

    /// Encrypt every configured attribute of `record` in place.
    ///
    /// Absent and `null` attributes are skipped.
    ///
    /// # Errors
    ///
    /// Stops at the first failing attribute; see the module docs on atomicity.
    pub fn encrypt_all<'r>(&self, record: &'r mut Value) -> Result<&'r mut Value, AttrError> {
        self.apply(record, Self::encrypt_attribute)?;
        debug!(attributes = self.attributes.len(), "encrypted record attributes");
        Ok(record)
    }

    /// Decrypt every configured attribute of `record` in place.
    ///
    /// # Errors
    ///
    /// Stops at the first failing attribute; see the module docs on atomicity.
    pub fn decrypt_all<'r>(&self, record: &'r mut Value) -> Result<&'r mut Value, AttrError> {
        self.apply(record, Self::decrypt_attribute)?;
        debug!(attributes = self.attributes.len(), "decrypted record attributes");
        Ok(record)
    }

    fn apply(&self, record: &mut Value, op: AttributeOp) -> Result<(), AttrError> {
        for attribute in &self.attributes {
            let value = match path::get(record, attribute) {
                None | Some(Value::Null) => continue,
                Some(value) => value.clone(),
            };
            let updated = op(self, record, value)?;
            path::set(record, attribute, updated)?;
            trace!(attribute = %attribute, "processed attribute");
        }
        Ok(())
    }

    /// Read the identity value the envelope must be bound to, if binding is on.
    ///
    /// Numbers, zero included, are bound by their JSON text. Booleans count as
    /// missing along with null, empty strings, arrays and objects, so `true`
    /// is never used as a shared identity across records.
    fn bound_identity(&self, record: &Value) -> Result<Option<String>, AttrError> {
        let Some(attribute) = self.config.identity_binding().attribute() else {
            return Ok(None);
        };
        match path::get(record, attribute) {
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            _ => Err(AttrError::MissingIdentity {
                attribute: attribute.to_owned(),
            }),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
