//! A task defining the flow to unshield (withdraw) a position, at a high
//! level the steps are:
//!     1. Re-derive the position's secret (prompts the wallet)
//!     2. Submit a withdrawal proof job and poll it to completion
//!     3. Hand the proof to the relayer, which signs and submits the payout
//!     4. Await finality, then mark the position withdrawn
//!
//! The user's wallet never signs the payout transaction; that is the
//! unlinkability guarantee. A relayer failure therefore means funds did not
//! move.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use chain_client::SubmitError;
use common::types::position::{Position, PositionPatch, PositionStatus};
use common::types::transaction::{TransactionKind, TransactionRecord};
use relayer_api::error::ApiError;
use relayer_api::types::{RelayUnshieldRequest, RelayUnshieldResponse, UnshieldProofRequest};
use serde::Serialize;
use state::StateError;
use tracing::instrument;
use util::get_current_time_millis;

use crate::helpers::{
    await_proof_job, format_lock_remaining, resolve_secret, ProofJobError,
    SecretResolutionError, NATIVE_TOKEN,
};
use crate::task_state::StateWrapper;
use crate::traits::{Task, TaskContext, TaskError, TaskState};

/// The task name to display when logging
const UNSHIELD_TASK_NAME: &str = "unshield";

// --------------
// | Task State |
// --------------

/// Defines the state of the unshield flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnshieldTaskState {
    /// The task is awaiting scheduling
    Pending,
    /// The task is re-deriving the position's secret
    Deriving,
    /// The task is submitting the proof generation job
    Requesting,
    /// The task is awaiting proof generation
    Generating,
    /// The task is handing the withdrawal to the relayer
    Relaying,
    /// The task is awaiting on-chain confirmation of the payout
    Confirming,
    /// Task completed
    Completed,
}

impl TaskState for UnshieldTaskState {
    fn completed(&self) -> bool {
        matches!(self, UnshieldTaskState::Completed)
    }
}

impl Display for UnshieldTaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UnshieldTaskState::Pending => write!(f, "Pending"),
            UnshieldTaskState::Deriving => write!(f, "Deriving"),
            UnshieldTaskState::Requesting => write!(f, "Requesting"),
            UnshieldTaskState::Generating => write!(f, "Generating"),
            UnshieldTaskState::Relaying => write!(f, "Relaying"),
            UnshieldTaskState::Confirming => write!(f, "Confirming"),
            UnshieldTaskState::Completed => write!(f, "Completed"),
        }
    }
}

/// Serialize implementation that uses the display implementation above
impl Serialize for UnshieldTaskState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<UnshieldTaskState> for StateWrapper {
    fn from(state: UnshieldTaskState) -> Self {
        StateWrapper::Unshield(state)
    }
}

// ---------------
// | Task Errors |
// ---------------

/// The error type for the unshield task
#[derive(Clone, Debug)]
pub enum UnshieldTaskError {
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
    /// The relayer failed to submit the withdrawal; funds did not move
    Relayer(String),
    /// The payout transaction failed or could not be confirmed
    Confirmation(String),
    /// Error interacting with the position repository
    State(String),
    /// The task was cancelled
    Cancelled,
}

impl TaskError for UnshieldTaskError {
    fn retryable(&self) -> bool {
        matches!(self, UnshieldTaskError::Api(_) | UnshieldTaskError::State(_))
    }

    fn user_message(&self) -> String {
        match self {
            UnshieldTaskError::Locked(remaining) => {
                format!("position is locked, available in {}", format_lock_remaining(*remaining))
            },
            UnshieldTaskError::Rejected => {
                "the wallet declined to sign the withdrawal".to_string()
            },
            UnshieldTaskError::Relayer(msg) => {
                format!("the relayer failed to submit the withdrawal, funds were not moved: {msg}")
            },
            other => other.to_string(),
        }
    }
}

impl Display for UnshieldTaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{self:?}")
    }
}
impl Error for UnshieldTaskError {}

impl From<ApiError> for UnshieldTaskError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Relayer(msg) => UnshieldTaskError::Relayer(msg),
            other if other.retryable() => UnshieldTaskError::Api(other.to_string()),
            other => UnshieldTaskError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<ProofJobError> for UnshieldTaskError {
    fn from(e: ProofJobError) -> Self {
        match e {
            ProofJobError::Poll(msg) => UnshieldTaskError::Api(msg),
            ProofJobError::JobFailed(msg) => UnshieldTaskError::ProofGeneration(msg),
            ProofJobError::TimedOut => {
                UnshieldTaskError::ProofGeneration("proof generation timed out".to_string())
            },
            ProofJobError::Cancelled => UnshieldTaskError::Cancelled,
        }
    }
}

impl From<SecretResolutionError> for UnshieldTaskError {
    fn from(e: SecretResolutionError) -> Self {
        match e {
            SecretResolutionError::Rejected => UnshieldTaskError::Rejected,
            SecretResolutionError::Signer(msg) => UnshieldTaskError::Api(msg),
            SecretResolutionError::MissingMaterial => UnshieldTaskError::MissingSecretMaterial,
        }
    }
}

impl From<SubmitError> for UnshieldTaskError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Cancelled => UnshieldTaskError::Cancelled,
            other => UnshieldTaskError::Confirmation(other.to_string()),
        }
    }
}

impl From<StateError> for UnshieldTaskError {
    fn from(e: StateError) -> Self {
        UnshieldTaskError::State(e.to_string())
    }
}

// -------------------
// | Task Definition |
// -------------------

/// The descriptor for the unshield task
pub use common::types::tasks::UnshieldTaskDescriptor;

/// The task itself, containing the position under withdrawal and the
/// execution state
pub struct UnshieldTask {
    /// The position being withdrawn
    pub position: Position,
    /// The payout address
    pub recipient: String,
    /// The resolved secret (hex), populated in the deriving step
    pub secret: Option<String>,
    /// The proof job's identifier, populated in the requesting step
    pub job_id: Option<String>,
    /// The relayer's response, populated in the relaying step
    pub relay: Option<RelayUnshieldResponse>,
    /// The context the task is run in
    pub ctx: TaskContext,
    /// The state of the task's execution
    pub task_state: UnshieldTaskState,
}

// -----------------------
// | Task Implementation |
// -----------------------

#[async_trait]
impl Task for UnshieldTask {
    type State = UnshieldTaskState;
    type Error = UnshieldTaskError;
    type Descriptor = UnshieldTaskDescriptor;

    async fn new(descriptor: Self::Descriptor, ctx: TaskContext) -> Result<Self, Self::Error> {
        let position = ctx
            .state
            .get_position(&descriptor.commitment)
            .ok_or(UnshieldTaskError::PositionNotFound(descriptor.commitment))?;

        // The lock is enforced before any network call is made
        if let Some(remaining) = position.lock_remaining(get_current_time_millis()) {
            return Err(UnshieldTaskError::Locked(remaining));
        }

        Ok(Self {
            position,
            recipient: descriptor.recipient,
            secret: None,
            job_id: None,
            relay: None,
            ctx,
            task_state: UnshieldTaskState::Pending,
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
            UnshieldTaskState::Pending => {
                self.task_state = UnshieldTaskState::Deriving;
            },
            UnshieldTaskState::Deriving => {
                self.secret =
                    Some(resolve_secret(&self.position, self.ctx.signer.as_ref()).await?);
                self.task_state = UnshieldTaskState::Requesting;
            },
            UnshieldTaskState::Requesting => {
                self.submit_proof_job().await?;
                self.task_state = UnshieldTaskState::Generating;
            },
            UnshieldTaskState::Generating => {
                self.await_proof().await?;
                self.task_state = UnshieldTaskState::Relaying;
            },
            UnshieldTaskState::Relaying => {
                self.relay_withdrawal().await?;
                self.task_state = UnshieldTaskState::Confirming;
            },
            UnshieldTaskState::Confirming => {
                self.confirm_and_record().await?;
                self.task_state = UnshieldTaskState::Completed;
            },
            UnshieldTaskState::Completed => {
                panic!("step() called in completed state")
            },
        }

        Ok(())
    }

    fn state(&self) -> Self::State {
        self.task_state.clone()
    }

    fn name(&self) -> String {
        UNSHIELD_TASK_NAME.to_string()
    }
}

// --------------
// | Task Steps |
// --------------

impl UnshieldTask {
    /// Submit the withdrawal proof generation job
    async fn submit_proof_job(&mut self) -> Result<(), UnshieldTaskError> {
        let secret = self
            .secret
            .clone()
            .ok_or(UnshieldTaskError::MissingSecretMaterial)?;

        let req = UnshieldProofRequest {
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
    async fn await_proof(&mut self) -> Result<(), UnshieldTaskError> {
        let job_id = self.job_id.clone().ok_or_else(|| {
            UnshieldTaskError::ProofGeneration("no proof job submitted".to_string())
        })?;

        await_proof_job(&self.ctx, &job_id, &self.state().to_string()).await?;
        Ok(())
    }

    /// Hand the completed proof job to the relayer for submission
    async fn relay_withdrawal(&mut self) -> Result<(), UnshieldTaskError> {
        let job_id = self.job_id.clone().ok_or_else(|| {
            UnshieldTaskError::ProofGeneration("no proof job submitted".to_string())
        })?;

        let req = RelayUnshieldRequest { job_id, recipient: self.recipient.clone() };
        let resp = self.ctx.api.relay_unshield(&req).await?;
        self.relay = Some(resp);
        Ok(())
    }

    /// Await finality of the relayer's transaction, then mark the position
    /// withdrawn and log the payout
    async fn confirm_and_record(&mut self) -> Result<(), UnshieldTaskError> {
        let relay = self
            .relay
            .clone()
            .ok_or_else(|| UnshieldTaskError::Relayer("no relayed withdrawal".to_string()))?;

        self.ctx
            .chain
            .confirm_with_timeout(
                &relay.signature,
                self.ctx.config.confirm_timeout,
                &self.ctx.cancel,
            )
            .await?;

        let patch = PositionPatch {
            status: Some(PositionStatus::Unshielded),
            shielded_amount: Some(0),
            delay_until: None,
        };
        self.ctx.state.update_position(&self.position.commitment, &patch)?;
        self.ctx.state.append_transaction(TransactionRecord::confirmed(
            TransactionKind::Unshield,
            NATIVE_TOKEN,
            relay.amount_sent,
            relay.signature,
            get_current_time_millis(),
        ))?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use common::types::position::{Position, PositionStatus};
    use common::types::tasks::UnshieldTaskDescriptor;
    use common::types::transaction::TransactionKind;
    use relayer_api::types::RelayUnshieldResponse;
    use util::backoff::CancelFlag;
    use util::get_current_time_millis;
    use uuid::Uuid;

    use crate::driver::{run_task_to_completion, RuntimeArgs};
    use crate::test_helpers::TestHarness;
    use crate::traits::{Task, TaskError};

    use super::{UnshieldTask, UnshieldTaskError};

    /// A shielded position seeded into the repository
    fn seed_position(harness: &TestHarness, amount: u64) -> Position {
        let position = Position::new_shielded(
            "ab".repeat(32),
            amount,
            Some(amount),
            "deadbeef".to_string(),
            1_000,
        );
        harness.state.add_position(position.clone()).unwrap();
        position
    }

    /// A withdrawal with a 30bps relayer fee records the net payout
    #[tokio::test(start_paused = true)]
    async fn test_unshield_with_fee() {
        let harness = TestHarness::new();
        let amount = 1_000_000_000;
        let position = seed_position(&harness, amount);

        // fee = max(amount * fee_bps / 10_000, minimum); 30bps clears the
        // minimum here
        let fee = amount * 30 / 10_000;
        harness.api.set_relay_response(RelayUnshieldResponse {
            signature: "relayer-sig".to_string(),
            fee,
            amount_sent: amount - fee,
            recipient: "payout-address".to_string(),
        });

        let descriptor = UnshieldTaskDescriptor {
            commitment: position.commitment.clone(),
            recipient: "payout-address".to_string(),
        };
        let task = UnshieldTask::new(descriptor, harness.ctx.clone()).await.unwrap();
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
        assert_eq!(updated.shielded_amount, 0);

        let records = harness.state.transactions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, TransactionKind::Unshield);
        assert_eq!(records[0].amount, 997_000_000);
        assert_eq!(records[0].tx_hash, "relayer-sig");

        // The user's wallet signed once for derivation, never for the
        // payout
        assert_eq!(harness.rpc.send_count(), 0);
    }

    /// A locked position is rejected before any network call
    #[tokio::test(start_paused = true)]
    async fn test_locked_position_rejected_offline() {
        let harness = TestHarness::new();
        let mut position = Position::new_shielded(
            "cd".repeat(32),
            1_000_000_000,
            Some(1_000_000_000),
            "deadbeef".to_string(),
            1_000,
        );
        position.delay_until = Some(get_current_time_millis() + 9_000_000); // 2.5 hours
        harness.state.add_position(position.clone()).unwrap();

        let descriptor = UnshieldTaskDescriptor {
            commitment: position.commitment,
            recipient: "payout-address".to_string(),
        };
        let err = match UnshieldTask::new(descriptor, harness.ctx.clone()).await {
            Err(e) => e,
            Ok(_) => panic!("expected Locked error"),
        };

        assert!(matches!(err, UnshieldTaskError::Locked(_)));
        assert!(err.user_message().contains("locked, available in 2h 30m"));
        assert_eq!(harness.api.total_calls(), 0);
    }

    /// A withdrawal of an unknown commitment fails without network calls
    #[tokio::test(start_paused = true)]
    async fn test_unknown_commitment() {
        let harness = TestHarness::new();
        let descriptor = UnshieldTaskDescriptor {
            commitment: "ef".repeat(32),
            recipient: "payout-address".to_string(),
        };

        let res = UnshieldTask::new(descriptor, harness.ctx.clone()).await;
        assert!(matches!(res, Err(UnshieldTaskError::PositionNotFound(_))));
        assert_eq!(harness.api.total_calls(), 0);
    }
}
