//! Types for pool statistics and service health

use serde::{Deserialize, Serialize};

/// Privacy pool statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatusResponse {
    /// Total value locked across pools, in the ledger's minor unit
    pub total_value_locked: u64,
    /// The number of deposits made
    pub total_deposits: u64,
    /// The size of the anonymity set
    pub anonymity_set_size: u64,
}

/// Information about a single denomination pool
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    /// The pool's denomination in the ledger's minor unit (0 = custom)
    pub denomination: u64,
    /// A human-readable label for the pool
    pub label: String,
    /// The pool's name
    pub name: String,
    /// The number of deposits in the pool (its anonymity set)
    pub deposit_count: u64,
    /// The pool's total value locked
    pub total_value_locked: u64,
}

/// The list of available denomination pools
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolsListResponse {
    /// All available pools
    pub pools: Vec<PoolInfo>,
    /// Whether the custom amount pool is enabled
    pub custom_enabled: bool,
}

/// Service health check response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// The service's health status
    pub status: String,
    /// The service's API version
    pub version: String,
    /// Whether the service's ledger RPC connection is healthy
    pub solana_connection: bool,
    /// The ledger RPC latency in milliseconds, when measured
    #[serde(default)]
    pub rpc_latency: Option<f64>,
    /// The on-chain program the service fronts
    pub program_id: String,
}
