//! Types for relayer-submitted withdrawals
//!
//! The relayer signs and submits the withdrawal so the user's wallet never
//! appears on the payout transaction; this is the unlinkability guarantee.

use serde::{Deserialize, Serialize};

/// Request to relay an unshield transaction through the relayer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayUnshieldRequest {
    /// The completed proof job's identifier
    pub job_id: String,
    /// The payout address
    pub recipient: String,
}

/// Response from relaying an unshield transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayUnshieldResponse {
    /// The relayer's transaction signature
    pub signature: String,
    /// The relayer fee charged, in the ledger's minor unit
    pub fee: u64,
    /// The amount delivered to the recipient after the fee
    pub amount_sent: u64,
    /// The payout address that received the funds
    pub recipient: String,
}

/// Information about the relayer service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerInfoResponse {
    /// Whether the relayer is accepting withdrawals
    pub enabled: bool,
    /// The relayer's public key
    pub public_key: String,
    /// The relayer's fee in basis points
    pub fee_bps: u64,
    /// The relayer's balance, in the ledger's minor unit
    pub balance: u64,
}
