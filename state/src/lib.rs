//! The wallet's position repository
//!
//! Holds positions and transaction history behind a shared lock, persists
//! every mutation to a device-local store, and optionally mirrors an
//! encrypted snapshot to a remote store so the same wallet converges
//! across devices.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod error;
pub mod positions;
pub mod remote;
pub mod storage;
pub mod sync;

pub use error::StateError;
pub use positions::merge_positions;
pub use remote::{EncryptedRecord, MemoryRemoteStore, RemoteStore};
pub use storage::{FileLocalStore, LocalStore, MemoryLocalStore, StoredState};
pub use sync::State;
