//! The transaction submitter
//!
//! Signs a transaction exactly once, then resends it with exponential
//! backoff up to a bounded attempt count. A "duplicate / already
//! processed" send error is recovered by checking the signed transaction's
//! own signature on-chain rather than treated as a failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use util::backoff::{poll_with_backoff, CancelFlag, PollConfig, PollError};
use util::hex::bytes_to_hex_string;
use veil_crypto::signer::{SignerError, WalletSigner};

use crate::error::SubmitError;
use crate::traits::{LedgerRpc, RpcError};
use crate::types::{SignedTransaction, TxStatus, UnsignedTransaction};

/// The default number of send attempts
const DEFAULT_MAX_RETRIES: usize = 3;
/// The base of the inter-attempt backoff, in seconds
const RETRY_BACKOFF_BASE_SECS: u64 = 2;
/// The interval between confirmation probes
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Options for a submission
#[derive(Clone, Copy, Debug)]
pub struct SubmitOptions {
    /// The maximum number of send attempts
    pub max_retries: usize,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES }
    }
}

/// A client for submitting and confirming transactions on the ledger
#[derive(Clone)]
pub struct ChainClient {
    /// The RPC node the client submits through
    rpc: Arc<dyn LedgerRpc>,
}

impl ChainClient {
    /// Construct a client over the given RPC
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> Self {
        Self { rpc }
    }

    /// Sign a transaction once and send it with bounded retry
    ///
    /// Returns the transaction signature. A wallet rejection is terminal; a
    /// duplicate-send report is reclassified as success once the signature
    /// is confirmed on-chain.
    pub async fn sign_and_send(
        &self,
        tx: &UnsignedTransaction,
        signer: &dyn WalletSigner,
        options: SubmitOptions,
    ) -> Result<String, SubmitError> {
        let signed = Self::sign_transaction(tx, signer).await?;

        let mut last_err = RpcError::Transport("no attempts made".to_string());
        for attempt in 1..=options.max_retries {
            let start = Instant::now();
            match self.rpc.send_raw_transaction(&signed).await {
                Ok(signature) => {
                    info!(
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "transaction sent"
                    );
                    return Ok(signature);
                },
                Err(RpcError::AlreadyProcessed(msg)) => {
                    info!(attempt, "send reported duplicate, verifying on-chain status");
                    if self.is_confirmed(&signed.signature).await {
                        return Ok(signed.signature.clone());
                    }
                    last_err = RpcError::AlreadyProcessed(msg);
                },
                Err(e) => {
                    warn!(
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "send attempt failed: {e}"
                    );
                    last_err = e;
                },
            }

            sleep(Duration::from_secs(RETRY_BACKOFF_BASE_SECS.pow(attempt as u32))).await;
        }

        Err(SubmitError::SubmissionFailed { attempts: options.max_retries, last: last_err })
    }

    /// Block until the transaction reaches finality or the budget elapses
    ///
    /// The cancel flag is checked before each probe; cancellation never
    /// aborts an in-flight RPC call.
    pub async fn confirm_with_timeout(
        &self,
        signature: &str,
        budget: Duration,
        cancel: &CancelFlag,
    ) -> Result<(), SubmitError> {
        let config = PollConfig::fixed(CONFIRM_POLL_INTERVAL, budget);
        let status = poll_with_backoff(
            || self.rpc.transaction_status(signature),
            TxStatus::is_terminal,
            config,
            cancel,
        )
        .await
        .map_err(|e| match e {
            PollError::Cancelled => SubmitError::Cancelled,
            PollError::TimedOut => SubmitError::ConfirmationTimeout,
            PollError::Probe(rpc) => SubmitError::Confirmation(rpc.to_string()),
        })?;

        match status {
            TxStatus::Confirmed => Ok(()),
            TxStatus::Failed(reason) => Err(SubmitError::Execution(reason)),
            // Unreachable: the predicate only accepts terminal statuses
            other => Err(SubmitError::Confirmation(format!("unexpected status {other:?}"))),
        }
    }

    // -----------
    // | Helpers |
    // -----------

    /// Sign the transaction payload exactly once
    async fn sign_transaction(
        tx: &UnsignedTransaction,
        signer: &dyn WalletSigner,
    ) -> Result<SignedTransaction, SubmitError> {
        let payload =
            serde_json::to_vec(tx).map_err(|e| SubmitError::Signer(e.to_string()))?;
        let signature = signer.sign_message(&payload).await.map_err(|e| match e {
            SignerError::Rejected => SubmitError::Rejected,
            other => SubmitError::Signer(other.to_string()),
        })?;

        Ok(SignedTransaction { payload, signature: bytes_to_hex_string(&signature) })
    }

    /// Whether the given signature is confirmed on-chain
    async fn is_confirmed(&self, signature: &str) -> bool {
        matches!(self.rpc.transaction_status(signature).await, Ok(TxStatus::Confirmed))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;
    use veil_crypto::signer::{LocalWalletSigner, SignerError, WalletSigner};

    use crate::mock::MockLedgerRpc;
    use crate::traits::RpcError;
    use crate::types::{TxStatus, UnsignedTransaction};

    use super::{ChainClient, SubmitError, SubmitOptions};

    /// A signer that always declines
    struct RejectingSigner;

    #[async_trait]
    impl WalletSigner for RejectingSigner {
        async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, SignerError> {
            Err(SignerError::Rejected)
        }

        fn public_key(&self) -> Vec<u8> {
            vec![0u8; 32]
        }
    }

    /// A dummy transaction for tests
    fn dummy_tx() -> UnsignedTransaction {
        UnsignedTransaction {
            instruction: serde_json::json!({"programId": "test"}),
            blockhash: "hash".to_string(),
        }
    }

    /// A first-attempt success makes exactly one send
    #[tokio::test(start_paused = true)]
    async fn test_send_first_attempt() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let client = ChainClient::new(rpc.clone());
        let signer = LocalWalletSigner::random();

        let sig = client
            .sign_and_send(&dummy_tx(), &signer, SubmitOptions::default())
            .await
            .unwrap();

        assert!(!sig.is_empty());
        assert_eq!(rpc.send_count(), 1);
    }

    /// Exhausting retries makes exactly `max_retries` sends with 2/4/8
    /// second gaps, then surfaces the last cause
    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_and_backoff() {
        let rpc = Arc::new(MockLedgerRpc::new());
        rpc.fail_sends_with(RpcError::Transport("connection reset".to_string()));
        let client = ChainClient::new(rpc.clone());
        let signer = LocalWalletSigner::random();

        let start = Instant::now();
        let res = client
            .sign_and_send(&dummy_tx(), &signer, SubmitOptions { max_retries: 3 })
            .await;

        assert!(matches!(
            res,
            Err(SubmitError::SubmissionFailed { attempts: 3, last: RpcError::Transport(_) })
        ));
        assert_eq!(rpc.send_count(), 3);
        // 2 + 4 + 8 seconds of backoff under paused time
        assert_eq!(start.elapsed(), Duration::from_secs(14));

        // Attempts were spaced 2 then 4 seconds apart
        let instants = rpc.send_instants();
        assert_eq!(instants[1] - instants[0], Duration::from_secs(2));
        assert_eq!(instants[2] - instants[1], Duration::from_secs(4));
    }

    /// A wallet rejection is terminal: no sends are made at all
    #[tokio::test(start_paused = true)]
    async fn test_rejection_is_terminal() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let client = ChainClient::new(rpc.clone());

        let res = client
            .sign_and_send(&dummy_tx(), &RejectingSigner, SubmitOptions::default())
            .await;

        assert!(matches!(res, Err(SubmitError::Rejected)));
        assert_eq!(rpc.send_count(), 0);
    }

    /// A duplicate-send report with a confirmed signature is success
    #[tokio::test(start_paused = true)]
    async fn test_already_processed_recovery() {
        let rpc = Arc::new(MockLedgerRpc::new());
        rpc.script_sends(vec![
            Err(RpcError::Transport("connection reset".to_string())),
            Err(RpcError::AlreadyProcessed("already processed".to_string())),
        ]);
        rpc.set_default_status(TxStatus::Confirmed);
        let client = ChainClient::new(rpc.clone());
        let signer = LocalWalletSigner::random();

        let sig = client
            .sign_and_send(&dummy_tx(), &signer, SubmitOptions::default())
            .await
            .unwrap();

        // The recovered signature is the one attached at signing time
        assert!(!sig.is_empty());
        assert_eq!(rpc.send_count(), 2);
    }

    /// Confirmation polls until the transaction is terminal
    #[tokio::test(start_paused = true)]
    async fn test_confirmation() {
        let rpc = Arc::new(MockLedgerRpc::new());
        rpc.script_statuses("sig1", vec![TxStatus::Pending, TxStatus::Pending, TxStatus::Confirmed]);
        let client = ChainClient::new(rpc);

        client
            .confirm_with_timeout(
                "sig1",
                Duration::from_secs(60),
                &util::backoff::CancelFlag::new(),
            )
            .await
            .unwrap();
    }

    /// An on-chain failure surfaces as an execution error
    #[tokio::test(start_paused = true)]
    async fn test_confirmation_failure() {
        let rpc = Arc::new(MockLedgerRpc::new());
        rpc.script_statuses("sig1", vec![TxStatus::Failed("nullifier spent".to_string())]);
        let client = ChainClient::new(rpc);

        let res = client
            .confirm_with_timeout(
                "sig1",
                Duration::from_secs(60),
                &util::backoff::CancelFlag::new(),
            )
            .await;

        assert!(matches!(res, Err(SubmitError::Execution(_))));
    }
}
