//! A task defining the flow to privately swap a position out of the pool,
//! at a high level the steps are:
//!     1. Re-derive the position's secret (prompts the wallet)
//!     2. Submit a withdrawal proof job and poll it to completion
//!     3. Quote the swap, then have the service execute unshield + swap
//!     4. Await finality, then mark the position withdrawn
//!
//! On ledgers without an atomic unshield+swap the service decomposes the
//! operation into two dependent transactions. If the unshield leg lands but
//! the swap leg fails there is no rollback: the position is marked
//! withdrawn and the failure is reported as a swap failure.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use chain_client::SubmitError;
use common::types::position::{Position, PositionPatch, PositionStatus};
use common::types::transaction::{TransactionKind, TransactionRecord};
use relayer_api::error::ApiError;
use relayer_api::types::{
    SwapExecuteRequest, SwapExecuteResponse, SwapQuoteRequest, SwapQuoteResponse,
};
use serde::Serialize;
use state::StateError;
use tracing::{info, instrument};
use util::get_current_time_millis;

use crate::helpers::{
    await_proof_job, format_lock_remaining, resolve_secret, ProofJobError,
    SecretResolutionError, NATIVE_TOKEN,
};
use crate::task_state::StateWrapper;
use crate::traits::{Task, TaskContext, TaskError, TaskState};

/// The task name to display when logging
const SWAP_TASK_NAME: &str = "swap";

// --------------
// | Task State |
// --------------

/// Defines the state of the private swap flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapTaskState {
    /// The task is awaiting scheduling
    Pending,
    /// The task is re-deriving the position's secret
    Deriving,
    /// The task is submitting the proof generation job
    Requesting,
    /// The task is awaiting proof generation
    Generating,
    /// The task is fetching a swap quote
    Quoting,
    /// The task is executing the unshield + swap through the service
    Executing,
    /// The task is awaiting on-chain confirmation of the swap
    Confirming,
    /// Task completed
    Completed,
}

impl TaskState for SwapTaskState {
    fn completed(&self) -> bool {
        matches!(self, SwapTaskState::Completed)
    }
}

impl Display for SwapTaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SwapTaskState::Pending => write!(f, "Pending"),
            SwapTaskState::Deriving => write!(f, "Deriving"),
            SwapTaskState::Requesting => write!(f, "Requesting"),
            SwapTaskState::Generating => write!(f, "Generating"),
            SwapTaskState::Quoting => write!(f, "Quoting"),
            SwapTaskState::Executing => write!(f, "Executing"),
            SwapTaskState::Confirming => write!(f, "Confirming"),
            SwapTaskState::Completed => write!(f, "Completed"),
        }
    }
}

/// Serialize implementation that uses the display implementation above
impl Serialize for SwapTaskState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<SwapTaskState> for StateWrapper {
    fn from(state: SwapTaskState) -> Self {
        StateWrapper::Swap(state)
    }
}

// ---------------
// | Task Errors |
// ---------------

/// The error type for the swap task
#[derive(Clone, Debug)]
pub enum SwapTaskError {
    /// The position is still under its withdrawal lock
    Locked(Duration),
    /// The referenced position does not exist
    PositionNotFound(String),
    /// The position carries neither a stored secret nor a nonce
    MissingSecretMaterial,
    /// The wallet declined to sign; never retried
    Rejected,
    /// A transient service or transport failure
    Api(String),
    /// The service rejected the request
    InvalidRequest(String),
    /// Proof generation failed or timed out
    ProofGeneration(String),
    /// The unshield leg landed but the swap leg failed; the position was
    /// withdrawn without swapping
    SwapLegFailed(String),
    /// The swap transaction failed or could not be confirmed
    Confirmation(String),
    /// The service returned a malformed response
    InvalidResponse(String),
    /// Error interacting with the position repository
    State(String),
    /// The task was cancelled
    Cancelled,
}

impl TaskError for SwapTaskError {
    fn retryable(&self) -> bool {
        matches!(self, SwapTaskError::Api(_) | SwapTaskError::State(_))
    }

    fn user_message(&self) -> String {
        match self {
            SwapTaskError::Locked(remaining) => {
                format!("position is locked, available in {}", format_lock_remaining(*remaining))
            },
            SwapTaskError::Rejected => "the wallet declined to sign the swap".to_string(),
            SwapTaskError::SwapLegFailed(msg) => {
                format!("swap failed after withdrawal, funds were unshielded without swapping: {msg}")
            },
            other => other.to_string(),
        }
    }
}

impl Display for SwapTaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{self:?}")
    }
}
impl Error for SwapTaskError {}

impl From<ApiError> for SwapTaskError {
    fn from(e: ApiError) -> Self {
        match e {
            other if other.retryable() => SwapTaskError::Api(other.to_string()),
            other => SwapTaskError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<ProofJobError> for SwapTaskError {
    fn from(e: ProofJobError) -> Self {
        match e {
            ProofJobError::Poll(msg) => SwapTaskError::Api(msg),
            ProofJobError::JobFailed(msg) => SwapTaskError::ProofGeneration(msg),
            ProofJobError::TimedOut => {
                SwapTaskError::ProofGeneration("proof generation timed out".to_string())
            },
            ProofJobError::Cancelled => SwapTaskError::Cancelled,
        }
    }
}

impl From<SecretResolutionError> for SwapTaskError {
    fn from(e: SecretResolutionError) -> Self {
        match e {
            SecretResolutionError::Rejected => SwapTaskError::Rejected,
            SecretResolutionError::Signer(msg) => SwapTaskError::Api(msg),
            SecretResolutionError::MissingMaterial => SwapTaskError::MissingSecretMaterial,
        }
    }
}

impl From<SubmitError> for SwapTaskError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Cancelled => SwapTaskError::Cancelled,
            other => SwapTaskError::Confirmation(other.to_string()),
        }
    }
}

impl From<StateError> for SwapTaskError {
    fn from(e: StateError) -> Self {
        SwapTaskError::State(e.to_string())
    }
}

// -------------------
// | Task Definition |
// -------------------

/// The descriptor for the swap task
pub use common::types::tasks::SwapTaskDescriptor;

/// The task itself, containing the position funding the swap and the
/// execution state
pub struct SwapTask {
    /// The position funding the swap
    pub position: Position,
    /// The payout address for the swap output
    pub recipient: String,
    /// The mint of the input token
    pub input_mint: String,
    /// The mint of the output token
    pub output_mint: String,
    /// The allowed slippage in basis points
    pub slippage_bps: u16,
    /// The resolved secret (hex), populated in the deriving step
    pub secret: Option<String>,
    /// The proof job's identifier, populated in the requesting step
    pub job_id: Option<String>,
    /// The quote, populated in the quoting step
    pub quote: Option<SwapQuoteResponse>,
    /// The execution response, populated in the executing step
    pub execution: Option<SwapExecuteResponse>,
    /// The context the task is run in
    pub ctx: TaskContext,
    /// The state of the task's execution
    pub task_state: SwapTaskState,
}

// -----------------------
// | Task Implementation |
// -----------------------

#[async_trait]
impl Task for SwapTask {
    type State = SwapTaskState;
    type Error = SwapTaskError;
    type Descriptor = SwapTaskDescriptor;

    async fn new(descriptor: Self::Descriptor, ctx: TaskContext) -> Result<Self, Self::Error> {
        let position = ctx
            .state
            .get_position(&descriptor.commitment)
            .ok_or(SwapTaskError::PositionNotFound(descriptor.commitment))?;

        // The lock is enforced before any network call is made
        if let Some(remaining) = position.lock_remaining(get_current_time_millis()) {
            return Err(SwapTaskError::Locked(remaining));
        }

        Ok(Self {
            position,
            recipient: descriptor.recipient,
            input_mint: descriptor.input_mint,
            output_mint: descriptor.output_mint,
            slippage_bps: descriptor.slippage_bps,
            secret: None,
            job_id: None,
            quote: None,
            execution: None,
            ctx,
            task_state: SwapTaskState::Pending,
        })
    }

    #[instrument(skip_all, err, fields(
        task = %self.name(),
        state = %self.state(),
        commitment = %self.position.commitment,
    ))]
    async fn step(&mut self) -> Result<(), Self::Error> {
        // Dispatch based on the current state of the task
        match self.state() {
            SwapTaskState::Pending => {
                self.task_state = SwapTaskState::Deriving;
            },
            SwapTaskState::Deriving => {
                self.secret =
                    Some(resolve_secret(&self.position, self.ctx.signer.as_ref()).await?);
                self.task_state = SwapTaskState::Requesting;
            },
            SwapTaskState::Requesting => {
                self.submit_proof_job().await?;
                self.task_state = SwapTaskState::Generating;
            },
            SwapTaskState::Generating => {
                self.await_proof().await?;
                self.task_state = SwapTaskState::Quoting;
            },
            SwapTaskState::Quoting => {
                self.fetch_quote().await?;
                self.task_state = SwapTaskState::Executing;
            },
            SwapTaskState::Executing => {
                self.execute_swap().await?;
                self.task_state = SwapTaskState::Confirming;
            },
            SwapTaskState::Confirming => {
                self.confirm_and_record().await?;
                self.task_state = SwapTaskState::Completed;
            },
            SwapTaskState::Completed => {
                panic!("step() called in completed state")
            },
        }

        Ok(())
    }

    fn state(&self) -> Self::State {
        self.task_state.clone()
    }

    fn name(&self) -> String {
        SWAP_TASK_NAME.to_string()
    }
}

// --------------
// | Task Steps |
// --------------

impl SwapTask {
    /// Submit the withdrawal proof generation job backing the swap
    async fn submit_proof_job(&mut self) -> Result<(), SwapTaskError> {
        let secret = self.secret.clone().ok_or(SwapTaskError::MissingSecretMaterial)?;

        let req = relayer_api::types::UnshieldProofRequest {
            commitment: self.position.commitment.clone(),
            secret,
            amount: self.position.amount,
            recipient: self.recipient.clone(),
            denomination: self.position.denomination,
        };

        let resp = self.ctx.api.request_unshield_proof(&req).await?;
        self.job_id = Some(resp.job_id);
        Ok(())
    }

    /// Poll the proof job until it completes
    async fn await_proof(&mut self) -> Result<(), SwapTaskError> {
        let job_id = self
            .job_id
            .clone()
            .ok_or_else(|| SwapTaskError::ProofGeneration("no proof job submitted".to_string()))?;

        await_proof_job(&self.ctx, &job_id, &self.state().to_string()).await?;
        Ok(())
    }

    /// Fetch a quote for the swap leg
    async fn fetch_quote(&mut self) -> Result<(), SwapTaskError> {
        let req = SwapQuoteRequest {
            input_mint: self.input_mint.clone(),
            output_mint: self.output_mint.clone(),
            amount: self.position.amount,
            slippage_bps: self.slippage_bps,
        };

        let quote = self.ctx.api.swap_quote(&req).await?;
        info!(
            out_amount = %quote.out_amount,
            minimum_received = %quote.minimum_received,
            "swap quoted"
        );
        self.quote = Some(quote);
        Ok(())
    }

    /// Execute the unshield + swap through the service
    ///
    /// A partial failure, where the unshield leg landed without the swap
    /// leg, still withdraws the position; there is nothing to roll back
    async fn execute_swap(&mut self) -> Result<(), SwapTaskError> {
        let job_id = self
            .job_id
            .clone()
            .ok_or_else(|| SwapTaskError::ProofGeneration("no proof job submitted".to_string()))?;

        let req = SwapExecuteRequest {
            job_id,
            recipient: self.recipient.clone(),
            output_mint: self.output_mint.clone(),
        };
        let resp = self.ctx.api.execute_swap(&req).await?;

        if !resp.swap_leg_succeeded() {
            self.mark_unshielded()?;
            self.ctx.state.append_transaction(TransactionRecord::confirmed(
                TransactionKind::Unshield,
                NATIVE_TOKEN,
                self.position.amount.saturating_sub(resp.fee),
                resp.unshield_signature.clone(),
                get_current_time_millis(),
            ))?;

            return Err(SwapTaskError::SwapLegFailed(
                "the unshield transaction landed but the swap did not".to_string(),
            ));
        }

        self.execution = Some(resp);
        Ok(())
    }

    /// Await finality of the swap leg, then mark the position withdrawn and
    /// log the swap
    async fn confirm_and_record(&mut self) -> Result<(), SwapTaskError> {
        let execution = self
            .execution
            .clone()
            .ok_or_else(|| SwapTaskError::Confirmation("no executed swap".to_string()))?;

        self.ctx
            .chain
            .confirm_with_timeout(
                &execution.swap_signature,
                self.ctx.config.confirm_timeout,
                &self.ctx.cancel,
            )
            .await?;

        let output_amount: u64 = execution.output_amount.parse().map_err(|_| {
            SwapTaskError::InvalidResponse(format!(
                "unparseable output amount {}",
                execution.output_amount
            ))
        })?;

        self.mark_unshielded()?;
        self.ctx.state.append_transaction(TransactionRecord::confirmed(
            TransactionKind::Swap,
            execution.output_mint,
            output_amount,
            execution.swap_signature,
            get_current_time_millis(),
        ))?;

        Ok(())
    }

    /// Mark the funding position as withdrawn
    fn mark_unshielded(&self) -> Result<(), SwapTaskError> {
        let patch = PositionPatch {
            status: Some(PositionStatus::Unshielded),
            shielded_amount: Some(0),
            delay_until: None,
        };
        self.ctx.state.update_position(&self.position.commitment, &patch)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use common::types::position::{Position, PositionStatus};
    use common::types::tasks::SwapTaskDescriptor;
    use common::types::transaction::TransactionKind;
    use relayer_api::types::SwapExecuteResponse;
    use util::backoff::CancelFlag;
    use uuid::Uuid;

    use crate::driver::{run_task_to_completion, RuntimeArgs};
    use crate::error::TaskDriverError;
    use crate::test_helpers::TestHarness;
    use crate::traits::Task;

    use super::SwapTask;

    /// A swap descriptor against the seeded position
    fn descriptor(commitment: String) -> SwapTaskDescriptor {
        SwapTaskDescriptor {
            commitment,
            recipient: "payout-address".to_string(),
            input_mint: "SOL".to_string(),
            output_mint: "USDC".to_string(),
            slippage_bps: 50,
        }
    }

    /// A shielded position seeded into the repository
    fn seed_position(harness: &TestHarness) -> Position {
        let position = Position::new_shielded(
            "ab".repeat(32),
            1_000_000_000,
            Some(1_000_000_000),
            "deadbeef".to_string(),
            1_000,
        );
        harness.state.add_position(position.clone()).unwrap();
        position
    }

    /// A completed swap withdraws the position and logs the output leg
    #[tokio::test(start_paused = true)]
    async fn test_swap_happy_path() {
        let harness = TestHarness::new();
        let position = seed_position(&harness);
        harness.api.set_swap_response(SwapExecuteResponse {
            unshield_signature: "unshield-sig".to_string(),
            swap_signature: "swap-sig".to_string(),
            output_amount: "24500000".to_string(),
            output_mint: "USDC".to_string(),
            recipient: "payout-address".to_string(),
            fee: 3_000_000,
        });

        let task = SwapTask::new(descriptor(position.commitment.clone()), harness.ctx.clone())
            .await
            .unwrap();
        run_task_to_completion(
            Uuid::new_v4(),
            task,
            RuntimeArgs::default(),
            &CancelFlag::new(),
            &harness.ctx.updates,
        )
        .await
        .unwrap();

        let updated = harness.state.get_position(&position.commitment).unwrap();
        assert_eq!(updated.status, PositionStatus::Unshielded);

        let records = harness.state.transactions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, TransactionKind::Swap);
        assert_eq!(records[0].token, "USDC");
        assert_eq!(records[0].amount, 24_500_000);
        assert_eq!(records[0].tx_hash, "swap-sig");
    }

    /// A failed swap leg still withdraws the position and surfaces a swap
    /// failure; there is no rollback
    #[tokio::test(start_paused = true)]
    async fn test_swap_partial_failure() {
        let harness = TestHarness::new();
        let position = seed_position(&harness);
        harness.api.set_swap_response(SwapExecuteResponse {
            unshield_signature: "unshield-sig".to_string(),
            swap_signature: String::new(),
            output_amount: "0".to_string(),
            output_mint: "USDC".to_string(),
            recipient: "payout-address".to_string(),
            fee: 3_000_000,
        });

        let task = SwapTask::new(descriptor(position.commitment.clone()), harness.ctx.clone())
            .await
            .unwrap();
        let res = run_task_to_completion(
            Uuid::new_v4(),
            task,
            RuntimeArgs::default(),
            &CancelFlag::new(),
            &harness.ctx.updates,
        )
        .await;

        let err = match res {
            Err(TaskDriverError::TaskFailed { message, .. }) => message,
            other => panic!("expected task failure, got {other:?}"),
        };
        assert!(err.contains("swap"));

        // The position is withdrawn despite the failure
        let updated = harness.state.get_position(&position.commitment).unwrap();
        assert_eq!(updated.status, PositionStatus::Unshielded);

        // The unshield leg is logged with the net amount
        let records = harness.state.transactions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, TransactionKind::Unshield);
        assert_eq!(records[0].amount, 997_000_000);
        assert_eq!(records[0].tx_hash, "unshield-sig");
    }
}
