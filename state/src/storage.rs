//! Local persistence for positions and transaction history
//!
//! The local store is plaintext and device-private; only the remote backup
//! is encrypted.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use common::types::position::Position;
use common::types::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};
use util::err_str;

use crate::error::StateError;

/// The durable snapshot written to the local store
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    /// The positions held by the wallet
    pub positions: Vec<Position>,
    /// The wallet's transaction history
    pub transactions: Vec<TransactionRecord>,
    /// The instant of the last successful cloud sync, unix millis
    pub last_synced: Option<u64>,
}

/// The interface to device-local persistence
pub trait LocalStore: Send + Sync {
    /// Load the stored snapshot, if one exists
    fn load(&self) -> Result<Option<StoredState>, StateError>;

    /// Durably replace the stored snapshot
    fn save(&self, state: &StoredState) -> Result<(), StateError>;
}

// ----------------
// | Memory Store |
// ----------------

/// An in-memory local store, used in tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryLocalStore {
    /// The current snapshot
    snapshot: Mutex<Option<StoredState>>,
}

impl MemoryLocalStore {
    /// Construct an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn load(&self) -> Result<Option<StoredState>, StateError> {
        Ok(self.snapshot.lock().map_err(err_str!(StateError::Storage))?.clone())
    }

    fn save(&self, state: &StoredState) -> Result<(), StateError> {
        *self.snapshot.lock().map_err(err_str!(StateError::Storage))? = Some(state.clone());
        Ok(())
    }
}

// --------------
// | File Store |
// --------------

/// A JSON-file local store
pub struct FileLocalStore {
    /// The path of the snapshot file
    path: PathBuf,
}

impl FileLocalStore {
    /// Construct a store over the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LocalStore for FileLocalStore {
    fn load(&self) -> Result<Option<StoredState>, StateError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path).map_err(err_str!(StateError::Storage))?;
        let state = serde_json::from_str(&raw).map_err(err_str!(StateError::Serde))?;
        Ok(Some(state))
    }

    fn save(&self, state: &StoredState) -> Result<(), StateError> {
        let raw = serde_json::to_string_pretty(state).map_err(err_str!(StateError::Serde))?;

        // Write to a sibling then rename so a crash never truncates the
        // snapshot
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(err_str!(StateError::Storage))?;
        fs::rename(&tmp, &self.path).map_err(err_str!(StateError::Storage))
    }
}
