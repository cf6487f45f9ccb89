//! Trait definitions for the ledger RPC seam

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{SignedTransaction, TxStatus};

/// The error type emitted by a ledger RPC
#[derive(Clone, Debug, Error)]
pub enum RpcError {
    /// The ledger reports the transaction was already processed
    ///
    /// Not a failure: the earlier send landed and the signature can be
    /// recovered from the signed transaction
    #[error("transaction already processed: {0}")]
    AlreadyProcessed(String),
    /// The RPC call could not be completed
    #[error("rpc transport error: {0}")]
    Transport(String),
    /// The ledger rejected the transaction
    #[error("transaction rejected by the ledger: {0}")]
    Rejected(String),
}

/// The interface to the ledger's RPC node
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Send a signed transaction, returning its signature
    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<String, RpcError>;

    /// Fetch the on-chain status of a transaction by signature
    async fn transaction_status(&self, signature: &str) -> Result<TxStatus, RpcError>;

    /// Fetch a recent blockhash
    async fn latest_blockhash(&self) -> Result<String, RpcError>;
}
