//! Self-describing textual envelope for one encrypted attribute value.
//!
//! # Envelope format
//!
//! ```text
//! base64(aad)$base64(nonce)$base64(ciphertext)$base64(tag, padding stripped)
//! ```
//!
//! where `aad` is the UTF-8 string `aes-256-gcm$<identity>$<key id>`. The
//! identity is empty when identity binding is off.
//!
//! Every envelope starts with [`ENVELOPE_PREFIX`], the base64 encoding of
//! `aes-256-gcm$`. That prefix is 12 bytes, a whole number of 3-byte base64
//! groups, so its encoding does not depend on what follows it. This is what
//! makes [`is_envelope`] a plain prefix test.

use std::str::FromStr;

use base64::{
    alphabet,
    engine::{general_purpose::STANDARD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use tracing::trace;

use crate::crypto::{cipher, NONCE_LEN, TAG_LEN};
use crate::error::AttrError;
use crate::keys::{KeyRing, SecretKey};

/// AEAD algorithm tag written at the start of the associated data.
pub const ALG_TAG: &str = "aes-256-gcm";

/// Separator between envelope segments and between associated-data fields.
pub const DELIMITER: char = '$';

/// `ALG_TAG` followed by `DELIMITER`: the fixed head of every associated-data string.
const AAD_PREFIX: &str = "aes-256-gcm$";

/// Base64 of [`AAD_PREFIX`]; the first 16 characters of every envelope.
pub const ENVELOPE_PREFIX: &str = "YWVzLTI1Ni1nY20k";

// The prefix test only works while the algorithm tag plus delimiter is a whole
// number of base64 groups.
const _: () = assert!(AAD_PREFIX.len() % 3 == 0);
const _: () = assert!(ENVELOPE_PREFIX.len() == AAD_PREFIX.len() / 3 * 4);

// A 16-byte tag encodes to 24 characters ending in exactly "==", which the
// envelope drops. Revisit TAG_SEGMENT_LEN and TAG_ENGINE if the tag length changes.
const _: () = assert!(TAG_LEN == 16);

/// Length of the stored tag segment: 24 padded base64 characters minus `==`.
pub const TAG_SEGMENT_LEN: usize = 22;

/// Standard alphabet, no padding on encode, padding optional on decode.
const TAG_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Returns `true` if `value` is an envelope produced by this codec.
///
/// Cheap prefix test; it does not validate the rest of the envelope.
pub fn is_envelope(value: &str) -> bool {
    value.starts_with(ENVELOPE_PREFIX)
}

/// The associated data authenticated alongside each ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedData {
    /// Bound record identity, empty when identity binding is off.
    pub identity: String,
    /// Id of the key the value was encrypted under.
    pub key_id: String,
}

impl AssociatedData {
    /// Build associated data for an optional identity and a key id.
    pub fn new(identity: Option<&str>, key_id: &str) -> Self {
        Self {
            identity: identity.unwrap_or_default().to_owned(),
            key_id: key_id.to_owned(),
        }
    }

    /// Encode as `aes-256-gcm$<identity>$<key id>`.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{AAD_PREFIX}{}{DELIMITER}{}", self.identity, self.key_id).into_bytes()
    }

    /// Parse the associated-data bytes of an envelope.
    ///
    /// Key ids never contain the delimiter, so the text is split at its last
    /// `$`; the identity keeps any `$` it contains.
    ///
    /// # Errors
    ///
    /// Returns [`AttrError::IntegrityFailure`] if the bytes are not UTF-8, do
    /// not start with the algorithm tag, or have no key id.
    pub fn parse(bytes: &[u8]) -> Result<Self, AttrError> {
        let text = std::str::from_utf8(bytes).map_err(|_| AttrError::IntegrityFailure)?;
        let rest = text
            .strip_prefix(AAD_PREFIX)
            .ok_or(AttrError::IntegrityFailure)?;
        let (identity, key_id) = rest
            .rsplit_once(DELIMITER)
            .ok_or(AttrError::IntegrityFailure)?;
        if key_id.is_empty() {
            return Err(AttrError::IntegrityFailure);
        }
        Ok(Self {
            identity: identity.to_owned(),
            key_id: key_id.to_owned(),
        })
    }
}

/// A parsed envelope: the four decoded segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw associated-data bytes, exactly as authenticated.
    pub associated_data: Vec<u8>,
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext bytes (without tag).
    pub ciphertext: Vec<u8>,
    /// Raw authentication tag bytes.
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Encode this envelope to its canonical string representation.
    pub fn to_string_repr(&self) -> String {
        format!(
            "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            STANDARD.encode(&self.associated_data),
            STANDARD.encode(self.nonce),
            STANDARD.encode(&self.ciphertext),
            TAG_ENGINE.encode(self.tag),
        )
    }
}

impl FromStr for Envelope {
    type Err = AttrError;

    /// Parse an envelope string.
    ///
    /// Every structural problem is reported as [`AttrError::IntegrityFailure`]:
    /// a malformed envelope is indistinguishable from a tampered one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        let [aad, nonce, ciphertext, tag] = parts.as_slice() else {
            return Err(AttrError::IntegrityFailure);
        };

        let associated_data = STANDARD
            .decode(aad)
            .map_err(|_| AttrError::IntegrityFailure)?;
        let ciphertext = STANDARD
            .decode(ciphertext)
            .map_err(|_| AttrError::IntegrityFailure)?;

        let nonce_bytes = STANDARD
            .decode(nonce)
            .map_err(|_| AttrError::IntegrityFailure)?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| AttrError::IntegrityFailure)?;

        let tag_bytes = TAG_ENGINE
            .decode(tag)
            .map_err(|_| AttrError::IntegrityFailure)?;
        let tag: [u8; TAG_LEN] = tag_bytes
            .try_into()
            .map_err(|_| AttrError::IntegrityFailure)?;

        Ok(Self {
            associated_data,
            nonce,
            ciphertext,
            tag,
        })
    }
}

/// Encrypt `plaintext` under `key` into an envelope string.
///
/// A fresh nonce is drawn for every call, so encoding the same plaintext twice
/// yields two different envelopes.
///
/// # Errors
///
/// Returns [`AttrError::IntegrityFailure`] if the AEAD rejects its inputs,
/// which cannot happen with a validated key.
pub fn encode(
    plaintext: &str,
    key: &SecretKey,
    key_id: &str,
    identity: Option<&str>,
) -> Result<String, AttrError> {
    let associated_data = AssociatedData::new(identity, key_id).to_bytes();
    let nonce = cipher::generate_nonce();
    let sealed = cipher::encrypt(key.as_bytes(), &nonce, &associated_data, plaintext.as_bytes())
        .map_err(|_| AttrError::IntegrityFailure)?;

    trace!(key_id, "sealed attribute value");
    Ok(Envelope {
        associated_data,
        nonce,
        ciphertext: sealed.ciphertext,
        tag: sealed.tag,
    }
    .to_string_repr())
}

/// Decrypt an envelope string.
///
/// `expected_identity` is `Some` exactly when identity binding is enabled; the
/// identity embedded in the envelope must then equal it.
///
/// # Errors
///
/// - [`AttrError::IntegrityFailure`] for a malformed envelope, a failed tag
///   check, or plaintext that is not UTF-8.
/// - [`AttrError::UnknownKey`] if the embedded key id is not in `keys`.
/// - [`AttrError::IdentityMismatch`] if the embedded identity differs from
///   `expected_identity`.
pub fn decode(
    envelope: &str,
    keys: &KeyRing,
    expected_identity: Option<&str>,
) -> Result<String, AttrError> {
    let envelope: Envelope = envelope.parse()?;
    let aad = AssociatedData::parse(&envelope.associated_data)?;

    let key = keys
        .get(&aad.key_id)
        .ok_or_else(|| AttrError::UnknownKey(aad.key_id.clone()))?;

    if let Some(expected) = expected_identity {
        if aad.identity != expected {
            return Err(AttrError::IdentityMismatch);
        }
    }

    let plaintext = cipher::decrypt(
        key.as_bytes(),
        &envelope.nonce,
        &envelope.associated_data,
        &envelope.ciphertext,
        &envelope.tag,
    )
    .map_err(|_| AttrError::IntegrityFailure)?;

    trace!(key_id = %aad.key_id, "opened attribute value");
    String::from_utf8(plaintext).map_err(|_| AttrError::IntegrityFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;

    fn ring() -> KeyRing {
        KeyRing::from_base64([
            ("k1", STANDARD.encode([0x11u8; KEY_LEN])),
            ("k2", STANDARD.encode([0x22u8; KEY_LEN])),
        ])
        .unwrap()
    }

    fn key(ring: &KeyRing, id: &str) -> SecretKey {
        ring.get(id).unwrap().clone()
    }

    #[test]
    fn prefix_is_base64_of_alg_tag() {
        assert_eq!(AAD_PREFIX, format!("{ALG_TAG}{DELIMITER}"));
        assert_eq!(STANDARD.encode(AAD_PREFIX), ENVELOPE_PREFIX);
        assert_eq!(ENVELOPE_PREFIX.len(), 16);
    }

    #[test]
    fn envelopes_share_fixed_prefix() {
        let ring = ring();
        let a = encode("hello", &key(&ring, "k1"), "k1", Some("u1")).unwrap();
        let b = encode("other", &key(&ring, "k2"), "k2", Some("a-much-longer-identity")).unwrap();
        let c = encode("plain", &key(&ring, "k1"), "k1", None).unwrap();
        assert_eq!(&a[..16], ENVELOPE_PREFIX);
        assert_eq!(&a[..16], &b[..16]);
        assert_eq!(&a[..16], &c[..16]);
        assert!(is_envelope(&a) && is_envelope(&b) && is_envelope(&c));
    }

    #[test]
    fn plain_strings_are_not_envelopes() {
        for value in ["hello", "", "YWVzLTI1Ni1nY20", "v1.abc.def", "aes-256-gcm$u1$k1"] {
            assert!(!is_envelope(value), "{value:?} misidentified");
        }
    }

    #[test]
    fn envelope_has_four_segments_and_unpadded_tag() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", Some("u1")).unwrap();
        let parts: Vec<&str> = env.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "YWVzLTI1Ni1nY20kdTEkazE=");
        assert_eq!(STANDARD.decode(parts[1]).unwrap().len(), NONCE_LEN);
        assert_eq!(parts[3].len(), TAG_SEGMENT_LEN);
        assert!(!parts[3].ends_with('='));
    }

    #[test]
    fn round_trip_with_and_without_identity() {
        let ring = ring();
        let bound = encode("hello", &key(&ring, "k1"), "k1", Some("u1")).unwrap();
        assert_eq!(decode(&bound, &ring, Some("u1")).unwrap(), "hello");

        let unbound = encode("hello", &key(&ring, "k1"), "k1", None).unwrap();
        assert_eq!(decode(&unbound, &ring, None).unwrap(), "hello");
    }

    #[test]
    fn round_trip_empty_and_unicode() {
        let ring = ring();
        for plaintext in ["", "naïve café ☕", "multi\nline$with$delims"] {
            let env = encode(plaintext, &key(&ring, "k2"), "k2", None).unwrap();
            assert_eq!(decode(&env, &ring, None).unwrap(), plaintext);
        }
    }

    #[test]
    fn identity_with_delimiter_round_trips() {
        let ring = ring();
        let env = encode("v", &key(&ring, "k1"), "k1", Some("tenant$42")).unwrap();
        assert_eq!(decode(&env, &ring, Some("tenant$42")).unwrap(), "v");
        assert_eq!(decode(&env, &ring, Some("42")), Err(AttrError::IdentityMismatch));
    }

    #[test]
    fn fresh_nonce_per_encode() {
        let ring = ring();
        let a = encode("same", &key(&ring, "k1"), "k1", None).unwrap();
        let b = encode("same", &key(&ring, "k1"), "k1", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn identity_mismatch_rejected() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", Some("u1")).unwrap();
        assert_eq!(decode(&env, &ring, Some("u2")), Err(AttrError::IdentityMismatch));
    }

    #[test]
    fn binding_off_ignores_embedded_identity() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", Some("u1")).unwrap();
        assert_eq!(decode(&env, &ring, None).unwrap(), "hello");
    }

    #[test]
    fn unknown_key_rejected() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", None).unwrap();
        let only_k2 = KeyRing::from_base64([("k2", STANDARD.encode([0x22u8; KEY_LEN]))]).unwrap();
        assert_eq!(decode(&env, &only_k2, None), Err(AttrError::UnknownKey("k1".into())));
    }

    #[test]
    fn every_bit_flip_in_ciphertext_or_tag_is_detected() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", None).unwrap();
        let parsed: Envelope = env.parse().unwrap();

        for byte in 0..parsed.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = parsed.clone();
                tampered.ciphertext[byte] ^= 1 << bit;
                assert_eq!(
                    decode(&tampered.to_string_repr(), &ring, None),
                    Err(AttrError::IntegrityFailure)
                );
            }
        }
        for byte in 0..TAG_LEN {
            for bit in 0..8 {
                let mut tampered = parsed.clone();
                tampered.tag[byte] ^= 1 << bit;
                assert_eq!(
                    decode(&tampered.to_string_repr(), &ring, None),
                    Err(AttrError::IntegrityFailure)
                );
            }
        }
    }

    #[test]
    fn forged_associated_data_detected() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", Some("u1")).unwrap();
        let mut parsed: Envelope = env.parse().unwrap();
        parsed.associated_data = AssociatedData::new(Some("u2"), "k1").to_bytes();
        assert_eq!(
            decode(&parsed.to_string_repr(), &ring, Some("u2")),
            Err(AttrError::IntegrityFailure)
        );
    }

    #[test]
    fn padded_tag_segment_accepted() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", None).unwrap();
        assert_eq!(decode(&format!("{env}=="), &ring, None).unwrap(), "hello");
    }

    #[test]
    fn malformed_envelopes_fail_integrity() {
        let ring = ring();
        let env = encode("hello", &key(&ring, "k1"), "k1", None).unwrap();
        let parts: Vec<&str> = env.split('$').collect();

        let cases = [
            format!("{}${}${}", parts[0], parts[1], parts[2]),
            format!("{env}$extra"),
            format!("{}$!!!${}${}", parts[0], parts[2], parts[3]),
            format!("{}$AAAA${}${}", parts[0], parts[2], parts[3]),
            format!("{}${}${}$AAAA", parts[0], parts[1], parts[2]),
            format!("{}${}${}${}", STANDARD.encode("aes-256-gcm$nokey"), parts[1], parts[2], parts[3]),
            format!("{}${}${}${}", STANDARD.encode("aes-256-gcm$u1$"), parts[1], parts[2], parts[3]),
        ];
        for case in cases {
            assert_eq!(decode(&case, &ring, None), Err(AttrError::IntegrityFailure), "{case}");
        }
    }

    #[test]
    fn associated_data_parse() {
        let aad = AssociatedData::parse(b"aes-256-gcm$u1$k1").unwrap();
        assert_eq!(aad, AssociatedData::new(Some("u1"), "k1"));
        let aad = AssociatedData::parse(b"aes-256-gcm$$k1").unwrap();
        assert_eq!(aad.identity, "");
        assert!(AssociatedData::parse(b"aes-128-gcm$u1$k1").is_err());
        assert!(AssociatedData::parse(&[0xFF, 0xFE]).is_err());
    }
}
