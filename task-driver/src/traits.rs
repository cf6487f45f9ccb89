//! Defines the traits a task and its state must implement, and the context
//! handed to every task at construction

use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use chain_client::ChainClient;
use common::types::tasks::TaskIdentifier;
use config::Config;
use relayer_api::client::PoolServiceApi;
use serde::Serialize;
use state::State;
use tokio::sync::watch;
use util::backoff::CancelFlag;
use veil_crypto::signer::WalletSigner;

use crate::task_state::{StateWrapper, TaskStatusUpdate};

/// The state of a task through its lifecycle
pub trait TaskState: Clone + Debug + Display + Send + Serialize {
    /// Whether the state is the task's terminal success state
    fn completed(&self) -> bool;
}

/// The error type a task may emit from a step
pub trait TaskError: Debug + Display + Send {
    /// Whether the driver should retry the step that produced this error
    fn retryable(&self) -> bool;

    /// The stable, user-facing description of the failure
    fn user_message(&self) -> String {
        self.to_string()
    }
}

/// The task trait defines a sequence of largely async flows, each of which
/// is possibly unreliable and may need to be retried until completion or to
/// some retry threshold
#[async_trait]
pub trait Task: Send + Sized {
    /// The state type of the task, used for task introspection
    type State: TaskState + Into<StateWrapper>;
    /// The error type that the task may give
    type Error: TaskError;
    /// The descriptor the task is constructed from
    type Descriptor;

    /// Construct the task from a descriptor and a context
    ///
    /// Validation that must precede any network call belongs here
    async fn new(descriptor: Self::Descriptor, ctx: TaskContext) -> Result<Self, Self::Error>;

    /// Get the current state of the task
    fn state(&self) -> Self::State;

    /// Whether or not the task is completed
    fn completed(&self) -> bool {
        self.state().completed()
    }

    /// Get a displayable name for the task
    fn name(&self) -> String;

    /// Take a step in the task, steps should represent largely async
    /// behavior
    async fn step(&mut self) -> Result<(), Self::Error>;

    /// A cleanup step that is run in the event of a task failure
    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The handles injected into every task
#[derive(Clone)]
pub struct TaskContext {
    /// The identifier assigned to the task
    pub task_id: TaskIdentifier,
    /// A handle on the shield/proof/relay service
    pub api: Arc<dyn PoolServiceApi>,
    /// The on-chain submission client
    pub chain: ChainClient,
    /// The position repository
    pub state: State,
    /// The wallet signer
    pub signer: Arc<dyn WalletSigner>,
    /// The runtime configuration
    pub config: Arc<Config>,
    /// The cooperative cancellation flag for the task
    pub cancel: CancelFlag,
    /// The channel task status updates are published onto
    pub updates: watch::Sender<TaskStatusUpdate>,
}
