//! The position repository and its cloud sync flow
//!
//! All mutations go through [`State`], which persists locally on every
//! change and pushes an encrypted snapshot to the remote store in the
//! background once cloud sync has been initialized.

use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use common::types::position::{Position, PositionPatch};
use common::types::transaction::TransactionRecord;
use common::{new_shared, Shared};
use tracing::{info, warn};
use util::get_current_time_millis;
use veil_crypto::cipher::{self, AeadKey};
use veil_crypto::signer::WalletSigner;

use crate::error::StateError;
use crate::positions::merge_positions;
use crate::remote::{EncryptedRecord, RemoteStore};
use crate::storage::{LocalStore, StoredState};

/// The message attached to a poisoned state lock
const ERR_LOCK_POISONED: &str = "state lock poisoned";

/// The mutable state behind the repository's shared lock
#[derive(Default)]
struct StateInner {
    /// The positions held by the wallet
    positions: Vec<Position>,
    /// The wallet's transaction history
    transactions: Vec<TransactionRecord>,
    /// The instant of the last successful cloud sync, unix millis
    last_synced: Option<u64>,
    /// The storage encryption key, present once cloud sync is initialized
    encryption_key: Option<AeadKey>,
    /// The remote lookup hash of the wallet, present alongside the key
    wallet_hash: Option<String>,
    /// Whether a cloud sync is currently in flight
    syncing: bool,
}

/// The position repository
///
/// Cheaply cloneable; all clones share the same underlying state
#[derive(Clone)]
pub struct State {
    /// The shared mutable state
    inner: Shared<StateInner>,
    /// The device-local store
    local: Arc<dyn LocalStore>,
    /// The encrypted remote store
    remote: Arc<dyn RemoteStore>,
}

impl State {
    /// Construct a repository over the given stores, hydrating from the
    /// local snapshot if one exists
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self, StateError> {
        let mut inner = StateInner::default();
        if let Some(snapshot) = local.load()? {
            inner.positions = snapshot.positions;
            inner.transactions = snapshot.transactions;
            inner.last_synced = snapshot.last_synced;
        }

        Ok(Self { inner: new_shared(inner), local, remote })
    }

    // -----------
    // | Getters |
    // -----------

    /// The current position set
    pub fn positions(&self) -> Vec<Position> {
        self.read().positions.clone()
    }

    /// Look up a position by commitment
    pub fn get_position(&self, commitment: &str) -> Option<Position> {
        self.read().positions.iter().find(|p| p.commitment == commitment).cloned()
    }

    /// The transaction history, most recent last
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.read().transactions.clone()
    }

    /// The instant of the last successful cloud sync, if any
    pub fn last_synced(&self) -> Option<u64> {
        self.read().last_synced
    }

    /// Whether cloud sync has been initialized for this session
    pub fn cloud_sync_active(&self) -> bool {
        self.read().encryption_key.is_some()
    }

    // -------------
    // | Mutations |
    // -------------

    /// Add a position to the repository
    pub fn add_position(&self, position: Position) -> Result<(), StateError> {
        self.write().positions.push(position);
        self.persist()
    }

    /// Apply a patch to the position with the given commitment
    pub fn update_position(
        &self,
        commitment: &str,
        patch: &PositionPatch,
    ) -> Result<Position, StateError> {
        let updated = {
            let mut inner = self.write();
            let position = inner
                .positions
                .iter_mut()
                .find(|p| p.commitment == commitment)
                .ok_or_else(|| StateError::PositionNotFound(commitment.to_string()))?;

            patch.apply(position);
            position.clone()
        };

        self.persist()?;
        Ok(updated)
    }

    /// Remove the position with the given commitment
    pub fn remove_position(&self, commitment: &str) -> Result<(), StateError> {
        self.write().positions.retain(|p| p.commitment != commitment);
        self.persist()
    }

    /// Replace the whole position set
    pub fn set_positions(&self, positions: Vec<Position>) -> Result<(), StateError> {
        self.write().positions = positions;
        self.persist()
    }

    /// Append a record to the transaction history
    pub fn append_transaction(&self, record: TransactionRecord) -> Result<(), StateError> {
        self.write().transactions.push(record);
        self.persist()
    }

    // --------------
    // | Cloud Sync |
    // --------------

    /// Initialize cloud sync for the given wallet
    ///
    /// Derives the storage key, pulls and decrypts the remote backup,
    /// merges it with the local set, and pushes the merged set back if it
    /// differs from what the remote held. A backup that fails to decrypt
    /// aborts the sync and leaves local data untouched.
    pub async fn init_cloud_sync(&self, signer: &dyn WalletSigner) -> Result<(), StateError> {
        if !self.begin_sync() {
            info!("cloud sync already in flight, skipping");
            return Ok(());
        }

        let res = self.sync_with_remote(signer).await;
        self.write().syncing = false;
        res
    }

    /// Tear down the cloud sync session, purging the key from memory
    ///
    /// Local data is kept; only the ability to read and write the remote
    /// backup is dropped
    pub fn disconnect(&self) {
        let mut inner = self.write();
        inner.encryption_key = None;
        inner.wallet_hash = None;
    }

    /// Mark a sync as in flight; returns false if one already is
    fn begin_sync(&self) -> bool {
        let mut inner = self.write();
        if inner.syncing {
            return false;
        }
        inner.syncing = true;
        true
    }

    /// The pull-merge-push body of a cloud sync
    async fn sync_with_remote(&self, signer: &dyn WalletSigner) -> Result<(), StateError> {
        let key = cipher::derive_storage_key(signer).await?;
        let wallet_hash = cipher::wallet_hash(&signer.public_key());

        let record = self.remote.fetch(&wallet_hash).await?;
        let remote_positions = match &record {
            Some(record) => decrypt_record(record, &key)?,
            None => Vec::new(),
        };

        let merged = {
            let mut inner = self.write();
            let merged = merge_positions(&inner.positions, &remote_positions);
            inner.positions = merged.clone();
            inner.encryption_key = Some(key);
            inner.wallet_hash = Some(wallet_hash.clone());
            inner.last_synced = Some(get_current_time_millis());
            merged
        };
        self.persist_local()?;

        // Self-heal: if the merge produced anything beyond what the remote
        // held, push it back so other devices converge
        if merged != remote_positions {
            push_record(self.remote.as_ref(), &key, &wallet_hash, &merged).await?;
        }

        info!(n_positions = merged.len(), "cloud sync complete");
        Ok(())
    }

    // -----------
    // | Helpers |
    // -----------

    /// Acquire the state read lock
    fn read(&self) -> RwLockReadGuard<'_, StateInner> {
        self.inner.read().expect(ERR_LOCK_POISONED)
    }

    /// Acquire the state write lock
    fn write(&self) -> RwLockWriteGuard<'_, StateInner> {
        self.inner.write().expect(ERR_LOCK_POISONED)
    }

    /// Persist the current snapshot locally and schedule a remote push
    fn persist(&self) -> Result<(), StateError> {
        self.persist_local()?;
        self.spawn_remote_push();
        Ok(())
    }

    /// Persist the current snapshot to the local store
    fn persist_local(&self) -> Result<(), StateError> {
        let snapshot = {
            let inner = self.read();
            StoredState {
                positions: inner.positions.clone(),
                transactions: inner.transactions.clone(),
                last_synced: inner.last_synced,
            }
        };

        self.local.save(&snapshot)
    }

    /// Push the current position set to the remote store in the background
    ///
    /// A no-op before cloud sync is initialized. Failures are logged, never
    /// surfaced; the local store remains the source of truth.
    fn spawn_remote_push(&self) {
        let (key, wallet_hash, positions) = {
            let inner = self.read();
            let (Some(key), Some(hash)) = (inner.encryption_key, inner.wallet_hash.clone())
            else {
                return;
            };
            (key, hash, inner.positions.clone())
        };

        let remote = self.remote.clone();
        tokio::spawn(async move {
            if let Err(e) = push_record(remote.as_ref(), &key, &wallet_hash, &positions).await {
                warn!("cloud push failed: {e}");
            }
        });
    }
}

/// Decrypt and deserialize a remote record's position set
fn decrypt_record(record: &EncryptedRecord, key: &AeadKey) -> Result<Vec<Position>, StateError> {
    let ciphertext = B64
        .decode(&record.encrypted_data)
        .map_err(|e| StateError::Serde(e.to_string()))?;
    let nonce = B64.decode(&record.nonce).map_err(|e| StateError::Serde(e.to_string()))?;

    let plaintext = cipher::decrypt(&ciphertext, &nonce, key)?;
    serde_json::from_slice(&plaintext).map_err(|e| StateError::Serde(e.to_string()))
}

/// Encrypt and upsert a position set to the remote store
async fn push_record(
    remote: &dyn RemoteStore,
    key: &AeadKey,
    wallet_hash: &str,
    positions: &[Position],
) -> Result<(), StateError> {
    let plaintext = serde_json::to_vec(positions).map_err(|e| StateError::Serde(e.to_string()))?;
    let (ciphertext, nonce) = cipher::encrypt(&plaintext, key)?;

    let record = EncryptedRecord {
        wallet_hash: wallet_hash.to_string(),
        encrypted_data: B64.encode(ciphertext),
        nonce: B64.encode(nonce),
        updated_at: get_current_time_millis(),
    };
    remote.upsert(&record).await
}
