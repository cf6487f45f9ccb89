//! Types for private swap quoting and execution

use serde::{Deserialize, Serialize};

/// The parameters of a swap quote lookup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapQuoteRequest {
    /// The mint of the input token
    pub input_mint: String,
    /// The mint of the output token
    pub output_mint: String,
    /// The input amount, in the input token's minor unit
    pub amount: u64,
    /// The allowed slippage in basis points
    pub slippage_bps: u16,
}

/// A swap quote from the service's aggregator
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuoteResponse {
    /// The mint of the input token
    pub input_mint: String,
    /// The mint of the output token
    pub output_mint: String,
    /// The input amount, as a decimal string
    pub in_amount: String,
    /// The expected output amount, as a decimal string
    pub out_amount: String,
    /// The quoted price impact percentage, as a decimal string
    pub price_impact_pct: String,
    /// The allowed slippage in basis points
    pub slippage_bps: u64,
    /// The minimum amount received under the slippage bound
    pub minimum_received: String,
}

/// Request to execute a private swap (unshield then swap)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapExecuteRequest {
    /// The completed proof job's identifier
    pub job_id: String,
    /// The payout address for the swap output
    pub recipient: String,
    /// The mint of the output token
    pub output_mint: String,
}

/// Response from executing a private swap
///
/// On ledgers without an atomic unshield+swap the service decomposes the
/// operation into two dependent transactions; `swap_signature` is empty
/// when the unshield leg landed but the swap leg did not
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapExecuteResponse {
    /// The signature of the unshield leg
    pub unshield_signature: String,
    /// The signature of the swap leg; empty if the swap leg failed
    #[serde(default)]
    pub swap_signature: String,
    /// The output amount delivered, as a decimal string
    pub output_amount: String,
    /// The mint of the output token
    pub output_mint: String,
    /// The payout address
    pub recipient: String,
    /// The relayer fee charged, in the ledger's minor unit
    pub fee: u64,
}

impl SwapExecuteResponse {
    /// Whether the swap leg landed
    pub fn swap_leg_succeeded(&self) -> bool {
        !self.swap_signature.is_empty()
    }
}
