//! The append-only transaction log types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a logged on-chain operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// A deposit into the privacy pool
    Shield,
    /// A withdrawal from the privacy pool
    Unshield,
    /// A withdrawal swapped into another token on the way out
    Swap,
}

/// The terminal status of a logged operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The transaction reached on-chain finality
    Confirmed,
    /// The transaction failed terminally
    Failed,
}

/// A log entry produced once per completed on-chain operation
///
/// Records are never mutated after creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// A unique identifier for the record
    pub id: Uuid,
    /// The kind of operation
    pub kind: TransactionKind,
    /// The token moved by the operation
    pub token: String,
    /// The amount moved, in the ledger's minor unit
    pub amount: u64,
    /// The time the record was created, in unix millis
    pub timestamp: u64,
    /// The on-chain transaction signature
    pub tx_hash: String,
    /// The terminal status of the operation
    pub status: TransactionStatus,
}

impl TransactionRecord {
    /// Create a confirmed record for an operation
    pub fn confirmed(
        kind: TransactionKind,
        token: impl Into<String>,
        amount: u64,
        tx_hash: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            token: token.into(),
            amount,
            timestamp,
            tx_hash: tx_hash.into(),
            status: TransactionStatus::Confirmed,
        }
    }
}
