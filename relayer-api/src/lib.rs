//! Wire types and the HTTP client for the shield/proof/relay/swap service
//!
//! The service is the only party that ever sees proof jobs; the relayer it
//! fronts signs withdrawal transactions so the user's wallet never appears
//! on the payout side.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpPoolServiceApi, PoolServiceApi};
pub use error::ApiError;
