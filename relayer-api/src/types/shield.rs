//! Types for preparing shield (deposit) transactions

use serde::{Deserialize, Serialize};

/// Request to prepare a shield transaction
///
/// When `commitment` is set the client derived the secret itself and the
/// service never sees it; the legacy path of service-side secret generation
/// is only used for imports
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShieldPrepareRequest {
    /// The amount to shield, in the ledger's minor unit
    pub amount: u64,
    /// The depositing wallet's address
    pub depositor: String,
    /// The client-derived commitment (64 hex characters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    /// The fixed-pool denomination, or `None` for the custom pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denomination: Option<u64>,
}

/// Response containing the prepared shield transaction data
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldPrepareResponse {
    /// The commitment the deposit is made under
    pub commitment: String,
    /// A service-generated secret; only present on the legacy path where
    /// the service derived the commitment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// The amount to shield, echoed back
    pub amount: u64,
    /// The serialized deposit instruction for the wallet to sign
    pub instruction: serde_json::Value,
    /// A recent blockhash to sign the transaction against
    pub blockhash: String,
}
