//! Encryption capability consumed by the packet codec.
//!
//! The codec never picks a cipher. It takes any `Cryptor` and an opaque key.
//! `ChaChaCryptor` is the stock implementation: XChaCha20-Poly1305 with a random
//! 24-byte nonce prepended to the ciphertext.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::error::{constants, ProtocolError, Result};

/// Nonce length for XChaCha20-Poly1305.
pub const NONCE_LEN: usize = 24;

/// Required key length in bytes.
pub const KEY_LEN: usize = 32;

/// Anything that can turn a plaintext block into a ciphertext block under a key.
pub trait Cryptor: Send + Sync {
    fn encrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>>;
}

/// XChaCha20-Poly1305 AEAD cryptor.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChaChaCryptor;

impl ChaChaCryptor {
    pub fn new() -> Self {
        Self
    }

    /// Generate a random 24-byte nonce
    pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
        let mut nonce = [0u8; NONCE_LEN];
        getrandom::fill(&mut nonce).map_err(|e| {
            ProtocolError::EncryptionFailure(format!("{}: {e}", constants::ERR_NONCE_GENERATION))
        })?;
        Ok(nonce)
    }

    /// Generate a random session key
    pub fn generate_key() -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        getrandom::fill(&mut key[..]).map_err(|e| {
            ProtocolError::EncryptionFailure(format!("{}: {e}", constants::ERR_NONCE_GENERATION))
        })?;
        Ok(key)
    }

    fn cipher(key: &[u8]) -> Option<XChaCha20Poly1305> {
        if key.len() != KEY_LEN {
            return None;
        }
        XChaCha20Poly1305::new_from_slice(key).ok()
    }
}

impl Cryptor for ChaChaCryptor {
    fn encrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let cipher = Self::cipher(key).ok_or_else(|| {
            ProtocolError::EncryptionFailure(constants::ERR_INVALID_KEY_LENGTH.to_string())
        })?;
        let nonce = Self::generate_nonce()?;

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), data)
            .map_err(|_| {
                ProtocolError::EncryptionFailure(constants::ERR_ENCRYPTION_FAILED.to_string())
            })?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let cipher = Self::cipher(key).ok_or_else(|| {
            ProtocolError::DecryptionFailure(constants::ERR_INVALID_KEY_LENGTH.to_string())
        })?;
        if data.len() < NONCE_LEN {
            return Err(ProtocolError::DecryptionFailure(
                constants::ERR_DECRYPTION_FAILED.to_string(),
            ));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| ProtocolError::DecryptionFailure(constants::ERR_DECRYPTION_FAILED.to_string()))
    }
}
