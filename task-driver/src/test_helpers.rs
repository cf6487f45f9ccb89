//! A mock service API and a pre-wired context for exercising tasks

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chain_client::mock::MockLedgerRpc;
use chain_client::ChainClient;
use common::types::proof::{ProofJobStatus, ProofResult};
use config::Config;
use relayer_api::client::PoolServiceApi;
use relayer_api::error::ApiError;
use relayer_api::types::{
    HealthResponse, PoolStatusResponse, PoolsListResponse, ProofJobResponse,
    ProofStatusResponse, RelayUnshieldRequest, RelayUnshieldResponse, RelayerInfoResponse,
    ShieldPrepareRequest, ShieldPrepareResponse, SwapExecuteRequest, SwapExecuteResponse,
    SwapQuoteRequest, SwapQuoteResponse, UnshieldProofRequest,
};
use state::{MemoryLocalStore, MemoryRemoteStore, State};
use tokio::sync::watch;
use util::backoff::CancelFlag;
use uuid::Uuid;
use veil_crypto::signer::LocalWalletSigner;

use crate::task_state::TaskStatusUpdate;
use crate::traits::TaskContext;

/// The job id handed out by the mock proof queue
const MOCK_JOB_ID: &str = "job-1";

/// A scripted, in-memory service API
#[derive(Default)]
pub(crate) struct MockPoolServiceApi {
    /// The total number of API calls made
    calls: AtomicUsize,
    /// The last prepare request received
    last_prepare: Mutex<Option<ShieldPrepareRequest>>,
    /// Scripted proof status responses; the default completes immediately
    proof_statuses: Mutex<VecDeque<ProofStatusResponse>>,
    /// The relay response to hand out
    relay_response: Mutex<Option<RelayUnshieldResponse>>,
    /// The swap execution response to hand out
    swap_response: Mutex<Option<SwapExecuteResponse>>,
}

impl MockPoolServiceApi {
    /// Construct a mock with default responses
    pub fn new() -> Self {
        Self::default()
    }

    /// The total number of API calls made
    pub fn total_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The last prepare request received, if any
    pub fn last_prepare_request(&self) -> Option<ShieldPrepareRequest> {
        self.last_prepare.lock().unwrap().clone()
    }

    /// Install a queue of proof status responses
    #[allow(dead_code)]
    pub fn script_proof_statuses(&self, statuses: Vec<ProofStatusResponse>) {
        *self.proof_statuses.lock().unwrap() = statuses.into();
    }

    /// Set the relay response
    pub fn set_relay_response(&self, resp: RelayUnshieldResponse) {
        *self.relay_response.lock().unwrap() = Some(resp);
    }

    /// Set the swap execution response
    pub fn set_swap_response(&self, resp: SwapExecuteResponse) {
        *self.swap_response.lock().unwrap() = Some(resp);
    }

    /// Count a call
    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PoolServiceApi for MockPoolServiceApi {
    async fn prepare_shield(
        &self,
        req: &ShieldPrepareRequest,
    ) -> Result<ShieldPrepareResponse, ApiError> {
        self.record_call();
        *self.last_prepare.lock().unwrap() = Some(req.clone());

        Ok(ShieldPrepareResponse {
            commitment: req.commitment.clone().unwrap_or_else(|| "00".repeat(32)),
            secret: None,
            amount: req.amount,
            instruction: serde_json::json!({ "programId": "veil", "accounts": [] }),
            blockhash: "mock-blockhash".to_string(),
        })
    }

    async fn request_unshield_proof(
        &self,
        _req: &UnshieldProofRequest,
    ) -> Result<ProofJobResponse, ApiError> {
        self.record_call();
        Ok(ProofJobResponse {
            job_id: MOCK_JOB_ID.to_string(),
            status: ProofJobStatus::Pending,
            estimated_time: 5,
        })
    }

    async fn proof_status(&self, job_id: &str) -> Result<ProofStatusResponse, ApiError> {
        self.record_call();
        if let Some(scripted) = self.proof_statuses.lock().unwrap().pop_front() {
            return Ok(scripted);
        }

        Ok(ProofStatusResponse {
            job_id: job_id.to_string(),
            status: ProofJobStatus::Completed,
            progress: 100,
            stage: Some("finalizing proof".to_string()),
            result: Some(ProofResult {
                proof: "aa".repeat(64),
                nullifier: "bb".repeat(32),
                public_inputs: serde_json::json!({}),
                verified: true,
            }),
            error: None,
        })
    }

    async fn relay_unshield(
        &self,
        _req: &RelayUnshieldRequest,
    ) -> Result<RelayUnshieldResponse, ApiError> {
        self.record_call();
        Ok(self.relay_response.lock().unwrap().clone().unwrap_or(RelayUnshieldResponse {
            signature: "relayer-sig".to_string(),
            fee: 5_000,
            amount_sent: 0,
            recipient: "payout-address".to_string(),
        }))
    }

    async fn relayer_info(&self) -> Result<RelayerInfoResponse, ApiError> {
        self.record_call();
        Ok(RelayerInfoResponse {
            enabled: true,
            public_key: "relayer-pubkey".to_string(),
            fee_bps: 30,
            balance: 10_000_000_000,
        })
    }

    async fn swap_quote(&self, req: &SwapQuoteRequest) -> Result<SwapQuoteResponse, ApiError> {
        self.record_call();
        Ok(SwapQuoteResponse {
            input_mint: req.input_mint.clone(),
            output_mint: req.output_mint.clone(),
            in_amount: req.amount.to_string(),
            out_amount: "24500000".to_string(),
            price_impact_pct: "0.01".to_string(),
            slippage_bps: req.slippage_bps as u64,
            minimum_received: "24377500".to_string(),
        })
    }

    async fn execute_swap(
        &self,
        _req: &SwapExecuteRequest,
    ) -> Result<SwapExecuteResponse, ApiError> {
        self.record_call();
        Ok(self.swap_response.lock().unwrap().clone().unwrap_or(SwapExecuteResponse {
            unshield_signature: "unshield-sig".to_string(),
            swap_signature: "swap-sig".to_string(),
            output_amount: "24500000".to_string(),
            output_mint: "USDC".to_string(),
            recipient: "payout-address".to_string(),
            fee: 5_000,
        }))
    }

    async fn pool_status(&self) -> Result<PoolStatusResponse, ApiError> {
        self.record_call();
        Ok(PoolStatusResponse {
            total_value_locked: 100_000_000_000,
            total_deposits: 512,
            anonymity_set_size: 512,
        })
    }

    async fn pools(&self) -> Result<PoolsListResponse, ApiError> {
        self.record_call();
        Ok(PoolsListResponse { pools: vec![], custom_enabled: true })
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.record_call();
        Ok(HealthResponse {
            status: "ok".to_string(),
            version: "0.1.0".to_string(),
            solana_connection: true,
            rpc_latency: Some(12.0),
            program_id: "veil-program".to_string(),
        })
    }
}

/// A fully wired mock environment for task tests
pub(crate) struct TestHarness {
    /// The context handed to tasks
    pub ctx: TaskContext,
    /// The position repository backing the context
    pub state: State,
    /// The mock service API backing the context
    pub api: Arc<MockPoolServiceApi>,
    /// The mock ledger RPC backing the context
    pub rpc: Arc<MockLedgerRpc>,
}

impl TestHarness {
    /// Build a harness over fresh mocks and a deterministic signer
    pub fn new() -> Self {
        let api = Arc::new(MockPoolServiceApi::new());
        let rpc = Arc::new(MockLedgerRpc::new());
        let state = State::new(
            Arc::new(MemoryLocalStore::new()),
            Arc::new(MemoryRemoteStore::new()),
        )
        .unwrap();

        let (updates, _) = watch::channel(TaskStatusUpdate::default());
        let ctx = TaskContext {
            task_id: Uuid::new_v4(),
            api: api.clone(),
            chain: ChainClient::new(rpc.clone()),
            state: state.clone(),
            signer: Arc::new(LocalWalletSigner::from_bytes(&[7u8; 32])),
            config: Arc::new(Config::default()),
            cancel: CancelFlag::new(),
            updates,
        };

        Self { ctx, state, api, rpc }
    }
}
