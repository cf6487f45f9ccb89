//! Generic wrappers around per-task state, and the status updates the
//! driver publishes for listeners

use std::fmt::{Display, Formatter, Result as FmtResult};

use common::types::tasks::TaskIdentifier;
use serde::Serialize;
use uuid::Uuid;

use crate::tasks::shield::ShieldTaskState;
use crate::tasks::swap::SwapTaskState;
use crate::tasks::unshield::UnshieldTaskState;

/// Defines a wrapper that allows state objects to be stored generically
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "task_type", content = "state")]
pub enum StateWrapper {
    /// The state object for the shield task
    Shield(ShieldTaskState),
    /// The state object for the unshield task
    Unshield(UnshieldTaskState),
    /// The state object for the swap task
    Swap(SwapTaskState),
}

impl Display for StateWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let out = match self {
            StateWrapper::Shield(state) => state.to_string(),
            StateWrapper::Unshield(state) => state.to_string(),
            StateWrapper::Swap(state) => state.to_string(),
        };
        write!(f, "{out}")
    }
}

/// A status update published while a task runs
///
/// State transitions come from the driver; progress and stage come from the
/// task itself while a proof job is in flight
#[derive(Clone, Debug, Serialize)]
pub struct TaskStatusUpdate {
    /// The identifier of the task
    pub task_id: TaskIdentifier,
    /// A display description of the task's current state
    pub state: String,
    /// Proof generation progress, 0 to 100, while a job is in flight
    pub progress: Option<u8>,
    /// A human-readable description of the current processing stage
    pub stage: Option<String>,
}

impl TaskStatusUpdate {
    /// An update marking a state transition
    pub fn transition(task_id: TaskIdentifier, state: String) -> Self {
        Self { task_id, state, progress: None, stage: None }
    }

    /// An update carrying proof generation progress
    pub fn progress(
        task_id: TaskIdentifier,
        state: String,
        progress: u8,
        stage: Option<String>,
    ) -> Self {
        Self { task_id, state, progress: Some(progress), stage }
    }
}

impl Default for TaskStatusUpdate {
    fn default() -> Self {
        Self::transition(Uuid::nil(), "Queued".to_string())
    }
}
