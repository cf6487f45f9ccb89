//! AES-256-GCM encryption for the remote position backup
//!
//! The key is derived by hashing a wallet signature over a fixed phrase, so
//! it can be re-derived on any device holding the wallet. The remote store
//! only ever sees ciphertext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use util::hex::bytes_to_hex_string;

use crate::signer::{SignerError, WalletSigner};

/// The fixed phrase signed to derive the storage encryption key
pub const STORAGE_KEY_MESSAGE: &[u8] = b"Derive your Veil storage encryption key (v1)";

/// The number of bytes in an AEAD key
pub const AEAD_KEY_BYTES: usize = 32;
/// The number of bytes in an AEAD nonce
pub const AEAD_NONCE_BYTES: usize = 12;

/// A derived symmetric encryption key
pub type AeadKey = [u8; AEAD_KEY_BYTES];
/// A per-encryption random nonce
pub type AeadNonce = [u8; AEAD_NONCE_BYTES];

/// The error type emitted by the encryption provider
#[derive(Clone, Debug, Error)]
pub enum CipherError {
    /// Decryption failed; wrong key or corrupted ciphertext
    ///
    /// This is surfaced rather than returning empty data, which would be
    /// indistinguishable from "no positions"
    #[error("decryption failed: wrong key or corrupted data")]
    DecryptionFailed,
    /// The provided nonce has the wrong length
    #[error("invalid nonce length: expected {AEAD_NONCE_BYTES} bytes, got {0}")]
    InvalidNonce(usize),
    /// Encryption itself failed
    #[error("encryption failed")]
    EncryptionFailed,
}

/// Derive a symmetric key from a wallet signature
pub fn derive_key(signature: &[u8]) -> AeadKey {
    Sha256::digest(signature).into()
}

/// Sign the fixed storage phrase and derive the storage key from it
///
/// May prompt the user; rejection and timeout propagate untouched
pub async fn derive_storage_key(signer: &dyn WalletSigner) -> Result<AeadKey, SignerError> {
    let signature = signer.sign_message(STORAGE_KEY_MESSAGE).await?;
    Ok(derive_key(&signature))
}

/// Hash a wallet public key into the remote lookup identifier
pub fn wallet_hash(pubkey: &[u8]) -> String {
    bytes_to_hex_string(&Sha256::digest(pubkey))
}

/// Encrypt a plaintext under the given key with a fresh random nonce
///
/// The nonce is never reused under the same key; reuse would break GCM
/// confidentiality
pub fn encrypt(plaintext: &[u8], key: &AeadKey) -> Result<(Vec<u8>, AeadNonce), CipherError> {
    let mut nonce = [0u8; AEAD_NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::EncryptionFailed)?;

    Ok((ciphertext, nonce))
}

/// Decrypt a ciphertext under the given key and nonce
///
/// Fails closed on tag mismatch; never returns garbage
pub fn decrypt(ciphertext: &[u8], nonce: &[u8], key: &AeadKey) -> Result<Vec<u8>, CipherError> {
    if nonce.len() != AEAD_NONCE_BYTES {
        return Err(CipherError::InvalidNonce(nonce.len()));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::DecryptionFailed)
}
