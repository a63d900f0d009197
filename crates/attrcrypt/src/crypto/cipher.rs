//! AES-256-GCM encryption and decryption with a detached authentication tag.
//!
//! The envelope stores the ciphertext and the tag as separate segments, so the
//! AEAD is driven through the in-place detached API rather than the combined
//! `ciphertext || tag` output.
//!
//! **Never reuse a nonce under the same key.** Callers obtain a fresh nonce from
//! [`generate_nonce`] for every encryption; GCM nonce reuse breaks both
//! confidentiality and authentication.

use aes_gcm::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, Nonce, OsRng},
    Aes256Gcm, Tag,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Output of [`encrypt`]: ciphertext and its detached tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Ciphertext bytes, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// Authentication tag over associated data and ciphertext.
    pub tag: [u8; TAG_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// The nonce is the wrong length (must be [`NONCE_LEN`] bytes).
    #[error("invalid nonce length: expected {NONCE_LEN} bytes")]
    InvalidNonceLength,

    /// The tag is the wrong length (must be [`TAG_LEN`] bytes).
    #[error("invalid tag length: expected {TAG_LEN} bytes")]
    InvalidTagLength,

    /// AES-GCM encryption failed or the tag did not verify.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Generate a fresh random 96-bit nonce from the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` and `nonce`, authenticating `associated_data`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] or [`CipherError::InvalidNonceLength`]
/// for malformed inputs, and [`CipherError::AeadFailure`] on an internal AEAD
/// error (unreachable with valid inputs).
pub fn encrypt(
    key: &[u8],
    nonce: &[u8],
    associated_data: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = build_nonce(nonce)?;

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(nonce, associated_data, &mut ciphertext)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok(Sealed {
        ciphertext,
        tag: tag_bytes,
    })
}

/// Decrypt `ciphertext`, verifying `tag` over `associated_data` and the ciphertext.
///
/// Nothing is returned unless the tag verifies; there is no partial plaintext.
///
/// # Errors
///
/// Returns a length error for malformed key, nonce or tag, and
/// [`CipherError::AeadFailure`] if authentication fails (wrong key, wrong
/// associated data, or tampered data).
pub fn decrypt(
    key: &[u8],
    nonce: &[u8],
    associated_data: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = build_nonce(nonce)?;
    if tag.len() != TAG_LEN {
        return Err(CipherError::InvalidTagLength);
    }

    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(nonce, associated_data, &mut plaintext, Tag::from_slice(tag))
        .map_err(|_| CipherError::AeadFailure)?;
    Ok(plaintext)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}

fn build_nonce(nonce: &[u8]) -> Result<&Nonce<Aes256Gcm>, CipherError> {
    if nonce.len() != NONCE_LEN {
        return Err(CipherError::InvalidNonceLength);
    }
    Ok(Nonce::<Aes256Gcm>::from_slice(nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = random_key();
        let nonce = generate_nonce();
        let sealed = encrypt(&key, &nonce, b"aad", b"123-45-6789").unwrap();
        let plaintext = decrypt(&key, &nonce, b"aad", &sealed.ciphertext, &sealed.tag).unwrap();
        assert_eq!(plaintext, b"123-45-6789");
    }

    #[test]
    fn ciphertext_is_detached_from_tag() {
        let key = random_key();
        let sealed = encrypt(&key, &generate_nonce(), b"", b"hello").unwrap();
        assert_eq!(sealed.ciphertext.len(), 5);
        assert_eq!(sealed.tag.len(), TAG_LEN);
    }

    #[test]
    fn fresh_nonce_every_call() {
        assert_ne!(generate_nonce(), generate_nonce());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let nonce = generate_nonce();
        let sealed = encrypt(&random_key(), &nonce, b"", b"secret").unwrap();
        let result = decrypt(&random_key(), &nonce, b"", &sealed.ciphertext, &sealed.tag);
        assert_eq!(result, Err(CipherError::AeadFailure));
    }

    #[test]
    fn wrong_associated_data_fails_decryption() {
        let key = random_key();
        let nonce = generate_nonce();
        let sealed = encrypt(&key, &nonce, b"record-1", b"secret").unwrap();
        let result = decrypt(&key, &nonce, b"record-2", &sealed.ciphertext, &sealed.tag);
        assert_eq!(result, Err(CipherError::AeadFailure));
    }

    #[test]
    fn tampered_tag_fails_auth() {
        let key = random_key();
        let nonce = generate_nonce();
        let mut sealed = encrypt(&key, &nonce, b"", b"tamper me").unwrap();
        sealed.tag[TAG_LEN - 1] ^= 0x01;
        assert!(decrypt(&key, &nonce, b"", &sealed.ciphertext, &sealed.tag).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let nonce = generate_nonce();
        let mut sealed = encrypt(&key, &nonce, b"", b"tamper me").unwrap();
        // Flip a byte in the ciphertext to simulate tampering.
        sealed.ciphertext[0] ^= 0xFF;
        assert!(decrypt(&key, &nonce, b"", &sealed.ciphertext, &sealed.tag).is_err());
    }

    #[test]
    fn nonce_of_exact_length_is_accepted() {
        let nonce = generate_nonce();
        assert_eq!(build_nonce(&nonce).unwrap().as_slice(), &nonce[..]);
        assert_eq!(build_nonce(&nonce[..11]), Err(CipherError::InvalidNonceLength));
    }

    #[test]
    fn invalid_lengths_rejected() {
        let key = random_key();
        let nonce = generate_nonce();
        assert_eq!(
            encrypt(&[0u8; 16], &nonce, b"", b"x"),
            Err(CipherError::InvalidKeyLength)
        );
        assert_eq!(
            encrypt(&key, &[0u8; 8], b"", b"x"),
            Err(CipherError::InvalidNonceLength)
        );
        assert_eq!(
            decrypt(&key, &nonce, b"", b"x", &[0u8; 12]),
            Err(CipherError::InvalidTagLength)
        );
    }
}
