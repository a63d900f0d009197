//! AES-256-GCM field encryption primitives.
//!
//! This module knows nothing about envelopes, records or key ids. It provides
//! the low-level encrypt/decrypt operations used by [`crate::envelope`].

pub mod cipher;

pub use cipher::{CipherError, Sealed, KEY_LEN, NONCE_LEN, TAG_LEN};
