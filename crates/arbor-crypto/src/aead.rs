//! Authenticated encryption
//!
//! The codec only depends on the [`AeadCipher`] trait, so the primitive can
//! be swapped for a hardware engine. [`Aes128GcmCipher`] is the software
//! implementation used everywhere else.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce, Tag};

use crate::error::{CryptoError, CryptoResult};
use crate::key::NetworkKey;

/// Nonce size for AES-GCM (12 bytes)
pub const IV_SIZE: usize = 12;

/// Authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// AEAD primitive with detached tags
///
/// Buffers are taken by value and handed back, so implementations may
/// encrypt in place.
pub trait AeadCipher: Send + Sync {
    /// Encrypt `plaintext` and authenticate it together with `aad`
    ///
    /// Returns the ciphertext (same length as the plaintext) and the tag.
    fn seal(
        &self,
        key: &NetworkKey,
        iv: &[u8; IV_SIZE],
        aad: &[u8],
        plaintext: Vec<u8>,
    ) -> CryptoResult<(Vec<u8>, [u8; TAG_SIZE])>;

    /// Verify `tag` over `aad` and `ciphertext`, then decrypt
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if authentication fails.
    fn open(
        &self,
        key: &NetworkKey,
        iv: &[u8; IV_SIZE],
        aad: &[u8],
        ciphertext: Vec<u8>,
        tag: &[u8; TAG_SIZE],
    ) -> CryptoResult<Vec<u8>>;
}

/// AES-128-GCM
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128GcmCipher;

impl AeadCipher for Aes128GcmCipher {
    fn seal(
        &self,
        key: &NetworkKey,
        iv: &[u8; IV_SIZE],
        aad: &[u8],
        plaintext: Vec<u8>,
    ) -> CryptoResult<(Vec<u8>, [u8; TAG_SIZE])> {
        let cipher = Aes128Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let mut buffer = plaintext;
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(tag.as_slice());
        Ok((buffer, tag_bytes))
    }

    fn open(
        &self,
        key: &NetworkKey,
        iv: &[u8; IV_SIZE],
        aad: &[u8],
        ciphertext: Vec<u8>,
        tag: &[u8; TAG_SIZE],
    ) -> CryptoResult<Vec<u8>> {
        let cipher = Aes128Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let mut buffer = ciphertext;
        cipher
            .decrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer, Tag::from_slice(tag))
            .map_err(|_| CryptoError::DecryptionFailed)?;

        Ok(buffer)
    }
}
