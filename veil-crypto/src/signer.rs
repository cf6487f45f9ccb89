//! Wallet signing abstraction
//!
//! Requesting a signature is a user-facing side effect (a wallet prompt in
//! a real host); callers must be able to tell a rejection apart from a
//! timeout, and neither is retryable implicitly.

use async_trait::async_trait;
use ed25519_dalek::{Signer as DalekSigner, SigningKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// The error type emitted by a wallet signer
#[derive(Clone, Debug, Error)]
pub enum SignerError {
    /// The user declined the signature request
    #[error("signature request rejected by the wallet")]
    Rejected,
    /// The signature request timed out without a user decision
    #[error("signature request timed out")]
    Timeout,
    /// The signer failed for another reason
    #[error("signer error: {0}")]
    Other(String),
}

/// A wallet capable of signing arbitrary messages on the user's behalf
///
/// Implementations may prompt the user; the same key must always produce
/// the same signature for the same message, since position secrets are
/// re-derived by re-signing
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Sign the given message, returning the raw signature bytes
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;

    /// The signer's public key bytes, used as the wallet identity
    fn public_key(&self) -> Vec<u8>;
}

/// A wallet signer backed by a locally held ed25519 key
///
/// ed25519 signatures are deterministic, so re-signing the same message
/// always re-derives the same position secret
#[derive(Clone)]
pub struct LocalWalletSigner {
    /// The underlying signing key
    key: SigningKey,
}

impl LocalWalletSigner {
    /// Construct a signer from raw key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self { key: SigningKey::from_bytes(bytes) }
    }

    /// Generate a signer with a random key
    pub fn random() -> Self {
        Self { key: SigningKey::generate(&mut OsRng) }
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }

    fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::{LocalWalletSigner, WalletSigner};

    /// Signing the same message twice yields the same signature
    #[tokio::test]
    async fn test_deterministic_signatures() {
        let signer = LocalWalletSigner::random();
        let msg = b"test message";

        let sig1 = signer.sign_message(msg).await.unwrap();
        let sig2 = signer.sign_message(msg).await.unwrap();
        assert_eq!(sig1, sig2);
    }
}
