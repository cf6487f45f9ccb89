//! A task defining the flow to shield (deposit) funds, at a high level the
//! steps are:
//!     1. Derive a fresh nonce, secret, and commitment (prompts the wallet)
//!     2. Ask the service to prepare the deposit transaction
//!     3. Sign and submit the deposit, then await finality
//!     4. Record the new position and its transaction log entry

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use async_trait::async_trait;
use chain_client::{SubmitError, SubmitOptions, UnsignedTransaction};
use common::types::position::Position;
use common::types::transaction::{TransactionKind, TransactionRecord};
use relayer_api::error::ApiError;
use relayer_api::types::{ShieldPrepareRequest, ShieldPrepareResponse};
use serde::Serialize;
use state::StateError;
use tracing::instrument;
use util::get_current_time_millis;
use veil_crypto::derivation::{derive_commitment, derive_position_secret, generate_nonce};
use veil_crypto::signer::SignerError;

use crate::helpers::NATIVE_TOKEN;
use crate::task_state::StateWrapper;
use crate::traits::{Task, TaskContext, TaskError, TaskState};

/// The task name to display when logging
const SHIELD_TASK_NAME: &str = "shield";

// --------------
// | Task State |
// --------------

/// Defines the state of the shield flow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShieldTaskState {
    /// The task is awaiting scheduling
    Pending,
    /// The task is deriving the position's secret and commitment
    Deriving,
    /// The task is requesting a prepared deposit from the service
    Requesting,
    /// The task is submitting the deposit transaction and awaiting
    /// finality
    SubmittingTx,
    /// The task is awaiting on-chain confirmation
    Confirming,
    /// Task completed
    Completed,
}

impl TaskState for ShieldTaskState {
    fn completed(&self) -> bool {
        matches!(self, ShieldTaskState::Completed)
    }
}

impl Display for ShieldTaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ShieldTaskState::Pending => write!(f, "Pending"),
            ShieldTaskState::Deriving => write!(f, "Deriving"),
            ShieldTaskState::Requesting => write!(f, "Requesting"),
            ShieldTaskState::SubmittingTx => write!(f, "Submitting Tx"),
            ShieldTaskState::Confirming => write!(f, "Confirming"),
            ShieldTaskState::Completed => write!(f, "Completed"),
        }
    }
}

/// Serialize implementation that uses the display implementation above
impl Serialize for ShieldTaskState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<ShieldTaskState> for StateWrapper {
    fn from(state: ShieldTaskState) -> Self {
        StateWrapper::Shield(state)
    }
}

// ---------------
// | Task Errors |
// ---------------

/// The error type for the shield task
#[derive(Clone, Debug)]
pub enum ShieldTaskError {
    /// The wallet declined to sign; never retried
    Rejected,
    /// A transient service or transport failure
    Api(String),
    /// The service rejected the request
    InvalidRequest(String),
    /// The on-chain submission failed
    Submission(String),
    /// Error interacting with the position repository
    State(String),
    /// Error deriving the position's secret
    Derivation(String),
}

impl TaskError for ShieldTaskError {
    fn retryable(&self) -> bool {
        matches!(self, ShieldTaskError::Api(_) | ShieldTaskError::State(_))
    }

    fn user_message(&self) -> String {
        match self {
            ShieldTaskError::Rejected => "the wallet declined to sign the deposit".to_string(),
            other => other.to_string(),
        }
    }
}

impl Display for ShieldTaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{self:?}")
    }
}
impl Error for ShieldTaskError {}

impl From<ApiError> for ShieldTaskError {
    fn from(e: ApiError) -> Self {
        if e.retryable() {
            ShieldTaskError::Api(e.to_string())
        } else {
            ShieldTaskError::InvalidRequest(e.to_string())
        }
    }
}

impl From<SubmitError> for ShieldTaskError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Rejected => ShieldTaskError::Rejected,
            other => ShieldTaskError::Submission(other.to_string()),
        }
    }
}

impl From<StateError> for ShieldTaskError {
    fn from(e: StateError) -> Self {
        ShieldTaskError::State(e.to_string())
    }
}

// -------------------
// | Task Definition |
// -------------------

/// The descriptor for the shield task
pub use common::types::tasks::ShieldTaskDescriptor;

/// The task itself, containing the descriptor, derived material, and
/// execution state
pub struct ShieldTask {
    /// The amount to shield, in the ledger's minor unit
    pub amount: u64,
    /// The depositing wallet's address
    pub depositor: String,
    /// The fixed-pool denomination, or `None` for a custom amount
    pub denomination: Option<u64>,
    /// The nonce derived for the new position
    pub nonce: Option<String>,
    /// The commitment derived for the new position
    pub commitment: Option<String>,
    /// The prepared deposit, populated in the requesting step
    pub prepared: Option<ShieldPrepareResponse>,
    /// The deposit's transaction signature, populated at submission
    pub signature: Option<String>,
    /// The context the task is run in
    pub ctx: TaskContext,
    /// The state of the task's execution
    pub task_state: ShieldTaskState,
}

// -----------------------
// | Task Implementation |
// -----------------------

#[async_trait]
impl Task for ShieldTask {
    type State = ShieldTaskState;
    type Error = ShieldTaskError;
    type Descriptor = ShieldTaskDescriptor;

    async fn new(descriptor: Self::Descriptor, ctx: TaskContext) -> Result<Self, Self::Error> {
        Ok(Self {
            amount: descriptor.amount,
            depositor: descriptor.depositor,
            denomination: descriptor.denomination,
            nonce: None,
            commitment: None,
            prepared: None,
            signature: None,
            ctx,
            task_state: ShieldTaskState::Pending,
        })
    }

    #[instrument(skip_all, err, fields(task = %self.name(), state = %self.state()))]
    async fn step(&mut self) -> Result<(), Self::Error> {
        // Dispatch based on the current state of the task
        match self.state() {
            ShieldTaskState::Pending => {
                self.task_state = ShieldTaskState::Deriving;
            },
            ShieldTaskState::Deriving => {
                self.derive_commitment().await?;
                self.task_state = ShieldTaskState::Requesting;
            },
            ShieldTaskState::Requesting => {
                self.request_prepared_deposit().await?;
                self.task_state = ShieldTaskState::SubmittingTx;
            },
            ShieldTaskState::SubmittingTx => {
                self.submit_deposit().await?;
                self.task_state = ShieldTaskState::Confirming;
            },
            ShieldTaskState::Confirming => {
                self.confirm_and_record().await?;
                self.task_state = ShieldTaskState::Completed;
            },
            ShieldTaskState::Completed => {
                panic!("step() called in completed state")
            },
        }

        Ok(())
    }

    fn state(&self) -> Self::State {
        self.task_state.clone()
    }

    fn name(&self) -> String {
        SHIELD_TASK_NAME.to_string()
    }
}

// --------------
// | Task Steps |
// --------------

impl ShieldTask {
    /// Derive the new position's nonce, secret, and commitment
    ///
    /// The secret never leaves this step; only its commitment is retained
    async fn derive_commitment(&mut self) -> Result<(), ShieldTaskError> {
        let nonce = generate_nonce();
        let secret = derive_position_secret(self.ctx.signer.as_ref(), &nonce)
            .await
            .map_err(|e| match e {
                SignerError::Rejected => ShieldTaskError::Rejected,
                other => ShieldTaskError::Derivation(other.to_string()),
            })?;

        self.commitment = Some(derive_commitment(self.amount, &secret));
        self.nonce = Some(nonce);
        Ok(())
    }

    /// Ask the service to prepare the deposit transaction
    async fn request_prepared_deposit(&mut self) -> Result<(), ShieldTaskError> {
        let req = ShieldPrepareRequest {
            amount: self.amount,
            depositor: self.depositor.clone(),
            commitment: self.commitment.clone(),
            denomination: self.denomination,
        };

        let resp = self.ctx.api.prepare_shield(&req).await?;
        self.prepared = Some(resp);
        Ok(())
    }

    /// Sign and submit the deposit transaction
    ///
    /// The depositor's wallet signs this transaction; it is the only flow
    /// in which the user's key appears on-chain
    async fn submit_deposit(&mut self) -> Result<(), ShieldTaskError> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| ShieldTaskError::Submission("no prepared deposit".to_string()))?;

        let tx = UnsignedTransaction {
            instruction: prepared.instruction.clone(),
            blockhash: prepared.blockhash.clone(),
        };
        let options = SubmitOptions { max_retries: self.ctx.config.max_send_retries };

        let signature =
            self.ctx.chain.sign_and_send(&tx, self.ctx.signer.as_ref(), options).await?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Await finality, then record the position and its log entry
    async fn confirm_and_record(&mut self) -> Result<(), ShieldTaskError> {
        let signature = self
            .signature
            .clone()
            .ok_or_else(|| ShieldTaskError::Submission("no submitted deposit".to_string()))?;

        self.ctx
            .chain
            .confirm_with_timeout(&signature, self.ctx.config.confirm_timeout, &self.ctx.cancel)
            .await?;

        let now = get_current_time_millis();
        let commitment = self
            .commitment
            .clone()
            .ok_or_else(|| ShieldTaskError::Derivation("no derived commitment".to_string()))?;
        let nonce = self
            .nonce
            .clone()
            .ok_or_else(|| ShieldTaskError::Derivation("no derived nonce".to_string()))?;

        let position =
            Position::new_shielded(commitment, self.amount, self.denomination, nonce, now);
        self.ctx.state.add_position(position)?;
        self.ctx.state.append_transaction(TransactionRecord::confirmed(
            TransactionKind::Shield,
            NATIVE_TOKEN,
            self.amount,
            signature,
            now,
        ))?;

        Ok(())
    }
}
