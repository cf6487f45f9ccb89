//! Proof job types, mirroring the proof service's wire contract
//!
//! Jobs are ephemeral and tracked server-side; the client only ever holds
//! them for the duration of an active operation.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// The status of a server-side proof generation job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofJobStatus {
    /// The job is queued but not yet picked up
    Pending,
    /// The job is actively generating a proof
    Processing,
    /// The job finished and a result is available
    Completed,
    /// The job failed; an error message is available
    Failed,
}

impl ProofJobStatus {
    /// Whether the job has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProofJobStatus::Completed | ProofJobStatus::Failed)
    }
}

impl Display for ProofJobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProofJobStatus::Pending => write!(f, "pending"),
            ProofJobStatus::Processing => write!(f, "processing"),
            ProofJobStatus::Completed => write!(f, "completed"),
            ProofJobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The output of a completed proof job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    /// The hex-encoded proof bytes
    pub proof: String,
    /// The hex-encoded nullifier published on withdrawal to prevent
    /// double-spending
    pub nullifier: String,
    /// The public inputs the proof was generated against
    pub public_inputs: serde_json::Value,
    /// Whether the service verified the proof before returning it
    pub verified: bool,
}
