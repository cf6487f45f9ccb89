//! Helpers for deriving position secrets and commitments
//!
//! The secret backing a position is never persisted. It is derived from a
//! wallet signature over a fixed message extended with the position's
//! nonce, so the same (wallet, nonce) pair always re-derives the same
//! secret. Commitment derivation is pure computation and never prompts the
//! wallet.

use sha2::{Digest, Sha256};
use util::hex::bytes_to_hex_string;

use crate::signer::{SignerError, WalletSigner};

/// The fixed message prefix signed to derive a position secret
///
/// The nonce is appended so each position derives a distinct secret from
/// the same wallet key
pub const POSITION_SECRET_MESSAGE_PREFIX: &str = "Unlock your Veil shielded position: ";

/// The number of bytes in a derived secret
pub const SECRET_BYTES: usize = 32;
/// The number of random bytes in a freshly generated nonce
const NONCE_BYTES: usize = 16;

/// A derived position secret
pub type PositionSecret = [u8; SECRET_BYTES];

/// Build the message signed to derive a position secret for the given nonce
pub fn secret_message(nonce: &str) -> Vec<u8> {
    format!("{POSITION_SECRET_MESSAGE_PREFIX}{nonce}").into_bytes()
}

/// Derive a position secret from a wallet signature over the fixed message
///
/// This may prompt the user; a rejection or timeout propagates untouched so
/// callers can distinguish the two
pub async fn derive_position_secret(
    signer: &dyn WalletSigner,
    nonce: &str,
) -> Result<PositionSecret, SignerError> {
    let signature = signer.sign_message(&secret_message(nonce)).await?;
    Ok(Sha256::digest(&signature).into())
}

/// Derive the commitment binding an amount and secret
///
/// Returns the hex encoding of `H(amount_le_bytes || secret)`
pub fn derive_commitment(amount: u64, secret: &PositionSecret) -> String {
    let mut hasher = Sha256::new();
    hasher.update(amount.to_le_bytes());
    hasher.update(secret);
    bytes_to_hex_string(&hasher.finalize())
}

/// Generate a fresh random nonce for a new position
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    bytes_to_hex_string(&bytes)
}

#[cfg(test)]
mod test {
    use crate::signer::LocalWalletSigner;

    use super::{derive_commitment, derive_position_secret, generate_nonce};

    /// The same (wallet, nonce) pair always re-derives the same secret
    #[tokio::test]
    async fn test_deterministic_secret() {
        let signer = LocalWalletSigner::random();
        let nonce = generate_nonce();

        let secret1 = derive_position_secret(&signer, &nonce).await.unwrap();
        let secret2 = derive_position_secret(&signer, &nonce).await.unwrap();
        assert_eq!(secret1, secret2);
    }

    /// Distinct nonces derive distinct secrets under the same wallet
    #[tokio::test]
    async fn test_nonce_separates_secrets() {
        let signer = LocalWalletSigner::random();

        let secret1 = derive_position_secret(&signer, &generate_nonce()).await.unwrap();
        let secret2 = derive_position_secret(&signer, &generate_nonce()).await.unwrap();
        assert_ne!(secret1, secret2);
    }

    /// Commitment derivation is deterministic in (amount, secret) and
    /// sensitive to both
    #[test]
    fn test_commitment_derivation() {
        let secret = [42u8; 32];

        let commitment = derive_commitment(1_000_000_000, &secret);
        assert_eq!(commitment, derive_commitment(1_000_000_000, &secret));
        assert_ne!(commitment, derive_commitment(1_000_000_001, &secret));
        assert_ne!(commitment, derive_commitment(1_000_000_000, &[43u8; 32]));
        assert_eq!(commitment.len(), 64);
    }
}
