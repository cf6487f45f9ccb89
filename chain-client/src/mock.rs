//! A mock ledger RPC for exercising the submitter without a node

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::traits::{LedgerRpc, RpcError};
use crate::types::{SignedTransaction, TxStatus};

/// A scripted, in-memory ledger RPC
///
/// Sends succeed by default; a scripted queue of results may be installed
/// to simulate transient failures, and per-signature status sequences may
/// be installed to simulate confirmation latency.
#[derive(Default)]
pub struct MockLedgerRpc {
    /// Scripted results for successive sends; once drained, sends succeed
    send_script: Mutex<VecDeque<Result<String, RpcError>>>,
    /// An error applied to every send, overriding the script
    send_failure: Mutex<Option<RpcError>>,
    /// The number of sends made
    send_count: AtomicUsize,
    /// The instants at which sends were made
    send_instants: Mutex<Vec<Instant>>,
    /// Scripted status sequences keyed by signature; the last entry repeats
    status_script: Mutex<HashMap<String, VecDeque<TxStatus>>>,
    /// The status returned for signatures with no script
    default_status: Mutex<TxStatus>,
}

impl MockLedgerRpc {
    /// Construct a mock whose sends succeed and whose statuses confirm
    pub fn new() -> Self {
        Self { default_status: Mutex::new(TxStatus::Confirmed), ..Default::default() }
    }

    /// Install a queue of results for successive sends
    pub fn script_sends(&self, results: Vec<Result<String, RpcError>>) {
        *self.send_script.lock().unwrap() = results.into();
    }

    /// Fail every send with the given error
    pub fn fail_sends_with(&self, err: RpcError) {
        *self.send_failure.lock().unwrap() = Some(err);
    }

    /// Install a status sequence for the given signature
    pub fn script_statuses(&self, signature: &str, statuses: Vec<TxStatus>) {
        self.status_script.lock().unwrap().insert(signature.to_string(), statuses.into());
    }

    /// Set the status returned for unscripted signatures
    pub fn set_default_status(&self, status: TxStatus) {
        *self.default_status.lock().unwrap() = status;
    }

    /// The number of sends made so far
    pub fn send_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    /// The instants at which sends were made
    pub fn send_instants(&self) -> Vec<Instant> {
        self.send_instants.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerRpc for MockLedgerRpc {
    async fn send_raw_transaction(&self, tx: &SignedTransaction) -> Result<String, RpcError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        self.send_instants.lock().unwrap().push(Instant::now());

        if let Some(err) = self.send_failure.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(res) = self.send_script.lock().unwrap().pop_front() {
            return res;
        }

        Ok(tx.signature.clone())
    }

    async fn transaction_status(&self, signature: &str) -> Result<TxStatus, RpcError> {
        let mut scripts = self.status_script.lock().unwrap();
        if let Some(seq) = scripts.get_mut(signature) {
            // The final scripted status repeats on subsequent probes
            let status = if seq.len() > 1 {
                seq.pop_front().unwrap() // safe: len checked
            } else {
                seq.front().cloned().unwrap_or(TxStatus::NotFound)
            };
            return Ok(status);
        }

        Ok(self.default_status.lock().unwrap().clone())
    }

    async fn latest_blockhash(&self) -> Result<String, RpcError> {
        Ok("mock-blockhash".to_string())
    }
}
