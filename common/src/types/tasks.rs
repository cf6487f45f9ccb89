//! Task descriptors and identifiers
//!
//! A descriptor fully specifies a user-initiated operation; the task driver
//! constructs the corresponding state machine from it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a task
pub type TaskIdentifier = Uuid;

/// A descriptor for a shield (deposit) operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldTaskDescriptor {
    /// The amount to shield, in the ledger's minor unit
    pub amount: u64,
    /// The depositing wallet's address
    pub depositor: String,
    /// The fixed-pool denomination to deposit into, or `None` for a custom
    /// amount
    pub denomination: Option<u64>,
}

/// A descriptor for an unshield (withdrawal) operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnshieldTaskDescriptor {
    /// The commitment of the position to withdraw
    pub commitment: String,
    /// The payout address; funds are sent here by the relayer
    pub recipient: String,
}

/// A descriptor for a private swap operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTaskDescriptor {
    /// The commitment of the position funding the swap
    pub commitment: String,
    /// The payout address for the swap output
    pub recipient: String,
    /// The mint of the input token
    pub input_mint: String,
    /// The mint of the output token
    pub output_mint: String,
    /// The allowed slippage in basis points
    pub slippage_bps: u16,
}

/// A wrapper around all task descriptor types
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskDescriptor {
    /// A shield operation
    Shield(ShieldTaskDescriptor),
    /// An unshield operation
    Unshield(UnshieldTaskDescriptor),
    /// A private swap operation
    Swap(SwapTaskDescriptor),
}

impl From<ShieldTaskDescriptor> for TaskDescriptor {
    fn from(desc: ShieldTaskDescriptor) -> Self {
        TaskDescriptor::Shield(desc)
    }
}

impl From<UnshieldTaskDescriptor> for TaskDescriptor {
    fn from(desc: UnshieldTaskDescriptor) -> Self {
        TaskDescriptor::Unshield(desc)
    }
}

impl From<SwapTaskDescriptor> for TaskDescriptor {
    fn from(desc: SwapTaskDescriptor) -> Self {
        TaskDescriptor::Swap(desc)
    }
}
