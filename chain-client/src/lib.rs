//! Provides a client for submitting and confirming transactions on the
//! ledger
//!
//! The ledger itself is reached through the [`LedgerRpc`] seam so the
//! submitter's retry and idempotency-recovery discipline can be exercised
//! against a mock.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod client;
pub mod error;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mocks"))]
pub mod mock;

pub use client::{ChainClient, SubmitOptions};
pub use error::SubmitError;
pub use traits::{LedgerRpc, RpcError};
pub use types::{SignedTransaction, TxStatus, UnsignedTransaction};
