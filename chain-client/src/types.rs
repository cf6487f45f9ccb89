//! Transaction types handled by the submitter

use serde::{Deserialize, Serialize};

/// A transaction prepared by the service but not yet signed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// The serialized instruction, opaque to the submitter
    pub instruction: serde_json::Value,
    /// The recent blockhash the transaction is signed against
    pub blockhash: String,
}

/// A signed transaction carrying its own signature
///
/// The signature is kept alongside the payload so it can be recovered when
/// a resend reports the transaction as already processed
#[derive(Clone, Debug)]
pub struct SignedTransaction {
    /// The serialized, signed payload
    pub payload: Vec<u8>,
    /// The transaction's signature
    pub signature: String,
}

/// The on-chain status of a submitted transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TxStatus {
    /// The transaction is not known to the ledger
    #[default]
    NotFound,
    /// The transaction is in flight but not final
    Pending,
    /// The transaction reached finality
    Confirmed,
    /// The transaction failed on-chain
    Failed(String),
}

impl TxStatus {
    /// Whether the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed(_))
    }
}
