//! The remote backup store
//!
//! The remote side only ever holds ciphertext keyed by a wallet hash; it
//! learns nothing about positions, amounts, or the wallet's public key.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use util::err_str;

use crate::error::StateError;

/// An encrypted position backup as held by the remote store
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    /// The hash of the owning wallet's public key, the lookup key
    pub wallet_hash: String,
    /// The AES-256-GCM ciphertext, base64 encoded
    pub encrypted_data: String,
    /// The encryption nonce, base64 encoded
    pub nonce: String,
    /// The instant the record was last written, unix millis
    pub updated_at: u64,
}

/// The interface to the remote backup store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the record for the given wallet hash, if one exists
    async fn fetch(&self, wallet_hash: &str) -> Result<Option<EncryptedRecord>, StateError>;

    /// Insert or replace the record for the record's wallet hash
    async fn upsert(&self, record: &EncryptedRecord) -> Result<(), StateError>;
}

/// An in-memory remote store, used in tests
#[derive(Default)]
pub struct MemoryRemoteStore {
    /// Records keyed by wallet hash
    records: Mutex<HashMap<String, EncryptedRecord>>,
}

impl MemoryRemoteStore {
    /// Construct an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at the record for the given wallet hash
    pub fn record(&self, wallet_hash: &str) -> Option<EncryptedRecord> {
        self.records.lock().ok()?.get(wallet_hash).cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch(&self, wallet_hash: &str) -> Result<Option<EncryptedRecord>, StateError> {
        Ok(self.records.lock().map_err(err_str!(StateError::Remote))?.get(wallet_hash).cloned())
    }

    async fn upsert(&self, record: &EncryptedRecord) -> Result<(), StateError> {
        self.records
            .lock()
            .map_err(err_str!(StateError::Remote))?
            .insert(record.wallet_hash.clone(), record.clone());
        Ok(())
    }
}
