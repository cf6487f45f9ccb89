//! Shielded position types
//!
//! A position is a claim on value deposited under a commitment. The secret
//! backing the claim is never stored; it is re-derived from the position's
//! nonce and a wallet signature at withdrawal time.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A hex-encoded commitment, the primary key of a position
pub type Commitment = String;

/// The lifecycle status of a shielded position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    /// The position's deposit is confirmed on-chain and spendable
    Shielded,
    /// The position has been withdrawn; it is kept for reconciliation
    /// history and never reused
    Unshielded,
    /// An operation on the position is in flight
    Pending,
    /// The last operation on the position failed terminally
    Failed,
}

impl Display for PositionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PositionStatus::Shielded => write!(f, "shielded"),
            PositionStatus::Unshielded => write!(f, "unshielded"),
            PositionStatus::Pending => write!(f, "pending"),
            PositionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A shielded value holding owned by the authenticated wallet session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// The cryptographic commitment binding the position's secret and
    /// amount; unique across the repository
    pub commitment: Commitment,
    /// The deposited value in the ledger's minor unit
    pub amount: u64,
    /// The value currently held under the commitment
    pub shielded_amount: u64,
    /// The fixed-pool size this deposit joined, or `None` for a custom
    /// amount (custom amounts carry a weaker anonymity set)
    pub denomination: Option<u64>,
    /// Opaque value mixed into the signing message when re-deriving the
    /// position's secret; required for any position without a stored secret
    pub nonce: Option<String>,
    /// Legacy-only stored secret (hex); new positions never populate this
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// The position's lifecycle status
    pub status: PositionStatus,
    /// If set, withdrawals are rejected before this instant (unix millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_until: Option<u64>,
    /// Creation time in unix millis, the tie-breaker for merges
    pub timestamp: u64,
}

impl Position {
    /// Create a freshly shielded position
    ///
    /// The secret field is intentionally absent; it is re-derived from the
    /// nonce on demand
    pub fn new_shielded(
        commitment: Commitment,
        amount: u64,
        denomination: Option<u64>,
        nonce: String,
        timestamp: u64,
    ) -> Self {
        Self {
            commitment,
            amount,
            shielded_amount: amount,
            denomination,
            nonce: Some(nonce),
            secret: None,
            status: PositionStatus::Shielded,
            delay_until: None,
            timestamp,
        }
    }

    /// Whether the position is locked for withdrawal at the given instant
    pub fn is_locked(&self, now_millis: u64) -> bool {
        self.delay_until.is_some_and(|t| t > now_millis)
    }

    /// The remaining lock duration at the given instant, if any
    pub fn lock_remaining(&self, now_millis: u64) -> Option<Duration> {
        let until = self.delay_until?;
        (until > now_millis).then(|| Duration::from_millis(until - now_millis))
    }
}

/// A partial update applied to an existing position
#[derive(Clone, Debug, Default)]
pub struct PositionPatch {
    /// The new status, if changed
    pub status: Option<PositionStatus>,
    /// The new shielded amount, if changed
    pub shielded_amount: Option<u64>,
    /// The new withdrawal lock, if changed
    pub delay_until: Option<Option<u64>>,
}

impl PositionPatch {
    /// A patch that only transitions the status
    pub fn status(status: PositionStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    /// Apply the patch to a position in place
    pub fn apply(&self, position: &mut Position) {
        if let Some(status) = self.status {
            position.status = status;
        }
        if let Some(amount) = self.shielded_amount {
            position.shielded_amount = amount;
        }
        if let Some(delay) = self.delay_until {
            position.delay_until = delay;
        }
    }
}
