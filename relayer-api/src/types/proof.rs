//! Types for proof job submission and polling

use common::types::proof::{ProofJobStatus, ProofResult};
use serde::{Deserialize, Serialize};

/// Request to generate an unshield (withdrawal) proof
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnshieldProofRequest {
    /// The commitment hash from the deposit (64 hex characters)
    pub commitment: String,
    /// The re-derived secret backing the commitment (64 hex characters)
    pub secret: String,
    /// The amount to unshield, in the ledger's minor unit
    pub amount: u64,
    /// The payout address
    pub recipient: String,
    /// The fixed-pool denomination, or `None` for the custom pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denomination: Option<u64>,
}

/// Response when a proof generation job is submitted
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofJobResponse {
    /// The identifier to poll for job status
    pub job_id: String,
    /// The job's status at submission time
    pub status: ProofJobStatus,
    /// The service's estimated completion time in seconds
    pub estimated_time: u64,
}

/// Response for a proof job status check
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofStatusResponse {
    /// The job's identifier
    pub job_id: String,
    /// The job's current status
    pub status: ProofJobStatus,
    /// Progress percentage, 0 to 100
    pub progress: u8,
    /// A human-readable description of the current processing stage
    #[serde(default)]
    pub stage: Option<String>,
    /// The proof result, present once completed
    #[serde(default)]
    pub result: Option<ProofResult>,
    /// The failure message, present once failed
    #[serde(default)]
    pub error: Option<String>,
}
