//! Error types for the state crate

use thiserror::Error;
use veil_crypto::cipher::CipherError;
use veil_crypto::signer::SignerError;

/// The error type emitted by state operations
#[derive(Clone, Debug, Error)]
pub enum StateError {
    /// A local storage read or write failed
    #[error("local storage error: {0}")]
    Storage(String),
    /// A remote store operation failed
    #[error("remote store error: {0}")]
    Remote(String),
    /// The remote backup could not be decrypted
    ///
    /// Surfaced rather than silently replacing local data; the local copy
    /// is left untouched
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
    /// The wallet signer failed while deriving the storage key
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
    /// The referenced position does not exist
    #[error("no position with commitment {0}")]
    PositionNotFound(String),
    /// A value could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serde(String),
}
