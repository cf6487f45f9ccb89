//! Error types for the chain client

use thiserror::Error;

use crate::traits::RpcError;

/// The error type emitted by the chain client
#[derive(Clone, Debug, Error)]
pub enum SubmitError {
    /// The wallet declined to sign the transaction; terminal, never retried
    #[error("transaction signing rejected by the wallet")]
    Rejected,
    /// The signer failed for a reason other than rejection
    #[error("signer error: {0}")]
    Signer(String),
    /// All send attempts were exhausted
    #[error("submission failed after {attempts} attempts: {last}")]
    SubmissionFailed {
        /// The number of send attempts made
        attempts: usize,
        /// The last underlying RPC error
        last: RpcError,
    },
    /// The transaction failed on-chain
    #[error("transaction failed on-chain: {0}")]
    Execution(String),
    /// Confirmation did not complete within the wall-clock budget
    #[error("confirmation timed out")]
    ConfirmationTimeout,
    /// Confirmation polling was cancelled by the caller
    #[error("confirmation cancelled")]
    Cancelled,
    /// Confirmation polling failed at the RPC layer
    #[error("confirmation failed: {0}")]
    Confirmation(String),
}
