//! The task driver drives a task forwards and executes retries of failed
//! steps

use std::time::Duration;

use common::types::tasks::TaskIdentifier;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info};
use util::backoff::CancelFlag;

use crate::error::TaskDriverError;
use crate::task_state::TaskStatusUpdate;
use crate::traits::{Task, TaskError};

/// The amount to increase the backoff delay by every retry
const BACKOFF_AMPLIFICATION_FACTOR: u32 = 2;
/// The maximum to increase the backoff to in milliseconds
const BACKOFF_CEILING_MS: u64 = 30_000; // 30 seconds
/// The initial backoff time when retrying a task
const INITIAL_BACKOFF_MS: u64 = 2_000; // 2 seconds
/// The number of times to retry a step in a task before propagating the
/// error
const TASK_DRIVER_N_RETRIES: usize = 5;

/// The runtime parameters of the driver's retry loop
#[derive(Clone, Copy, Debug)]
pub struct RuntimeArgs {
    /// The multiplicative increase in backoff timeout after a failed step
    pub backoff_amplification_factor: u32,
    /// The maximum backoff timeout
    pub backoff_ceiling: Duration,
    /// The initial backoff timeout
    pub initial_backoff: Duration,
    /// The number of retries to attempt before propagating an error
    pub n_retries: usize,
}

impl Default for RuntimeArgs {
    fn default() -> Self {
        Self {
            backoff_amplification_factor: BACKOFF_AMPLIFICATION_FACTOR,
            backoff_ceiling: Duration::from_millis(BACKOFF_CEILING_MS),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            n_retries: TASK_DRIVER_N_RETRIES,
        }
    }
}

/// Run a task to completion
///
/// Each step is retried with multiplicative backoff while the task reports
/// the error as retryable; non-retryable errors and exhausted retries abort
/// the task after running its cleanup. State transitions are logged and
/// published on the updates channel.
pub async fn run_task_to_completion<T: Task>(
    task_id: TaskIdentifier,
    mut task: T,
    args: RuntimeArgs,
    cancel: &CancelFlag,
    updates: &watch::Sender<TaskStatusUpdate>,
) -> Result<(), TaskDriverError> {
    let task_name = task.name();

    while !task.completed() {
        if cancel.is_cancelled() {
            run_cleanup(&mut task).await;
            return Err(TaskDriverError::Cancelled);
        }

        // Take a step, retrying while the task reports the failure as
        // transient
        let mut retries = args.n_retries;
        let mut curr_backoff = args.initial_backoff;

        while let Err(e) = task.step().await {
            error!(task = %task_name, %task_id, "error executing task step: {e}");
            retries -= 1;

            if !e.retryable() || retries == 0 {
                let message = e.user_message();
                run_cleanup(&mut task).await;
                return Err(TaskDriverError::TaskFailed { task: task_name, message });
            }

            sleep(curr_backoff).await;
            if cancel.is_cancelled() {
                run_cleanup(&mut task).await;
                return Err(TaskDriverError::Cancelled);
            }

            info!(task = %task_name, %task_id, "retrying from state: {}", task.state());
            curr_backoff *= args.backoff_amplification_factor;
            curr_backoff = Duration::min(curr_backoff, args.backoff_ceiling);
        }

        // Publish the new state for listeners on this task
        let task_state = task.state();
        info!(task = %task_name, %task_id, "transitioning to state {task_state}");
        updates.send_replace(TaskStatusUpdate::transition(task_id, task_state.to_string()));
    }

    Ok(())
}

/// Run a task's cleanup, logging any failure
async fn run_cleanup<T: Task>(task: &mut T) {
    if let Err(e) = task.cleanup().await {
        error!(task = %task.name(), "error cleaning up task: {e}");
    }
}

#[cfg(test)]
mod test {
    use std::fmt::{Display, Formatter, Result as FmtResult};

    use async_trait::async_trait;
    use serde::Serialize;
    use tokio::sync::watch;
    use util::backoff::CancelFlag;
    use uuid::Uuid;

    use crate::error::TaskDriverError;
    use crate::task_state::{StateWrapper, TaskStatusUpdate};
    use crate::tasks::shield::ShieldTaskState;
    use crate::traits::{Task, TaskContext, TaskError, TaskState};

    use super::{run_task_to_completion, RuntimeArgs};

    /// A state for the scripted test task, reusing the shield state shape
    #[derive(Clone, Debug, Serialize)]
    struct ScriptedState(bool);

    impl Display for ScriptedState {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            write!(f, "{}", if self.0 { "Completed" } else { "Running" })
        }
    }

    impl TaskState for ScriptedState {
        fn completed(&self) -> bool {
            self.0
        }
    }

    impl From<ScriptedState> for StateWrapper {
        fn from(state: ScriptedState) -> Self {
            // The wrapper variant is irrelevant for driver tests
            StateWrapper::Shield(if state.0 {
                ShieldTaskState::Completed
            } else {
                ShieldTaskState::Pending
            })
        }
    }

    /// An error whose retryability is scripted
    #[derive(Clone, Debug)]
    struct ScriptedError(bool);

    impl Display for ScriptedError {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            write!(f, "scripted error")
        }
    }

    impl TaskError for ScriptedError {
        fn retryable(&self) -> bool {
            self.0
        }
    }

    /// A task that fails a scripted number of times before completing
    struct ScriptedTask {
        /// The number of failures left to emit
        failures_left: usize,
        /// Whether emitted failures are retryable
        retryable: bool,
        /// The number of steps taken
        steps: usize,
        /// Whether the task has completed
        done: bool,
    }

    #[async_trait]
    impl Task for ScriptedTask {
        type State = ScriptedState;
        type Error = ScriptedError;
        type Descriptor = ();

        async fn new(_descriptor: (), _ctx: TaskContext) -> Result<Self, Self::Error> {
            unimplemented!("constructed directly in tests")
        }

        fn state(&self) -> Self::State {
            ScriptedState(self.done)
        }

        fn name(&self) -> String {
            "scripted".to_string()
        }

        async fn step(&mut self) -> Result<(), Self::Error> {
            self.steps += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(ScriptedError(self.retryable));
            }

            self.done = true;
            Ok(())
        }
    }

    /// A watch channel for driver updates
    fn updates_channel() -> watch::Sender<TaskStatusUpdate> {
        watch::channel(TaskStatusUpdate::default()).0
    }

    /// Transient failures are retried until the task completes
    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let task = ScriptedTask { failures_left: 2, retryable: true, steps: 0, done: false };
        let updates = updates_channel();

        run_task_to_completion(
            Uuid::new_v4(),
            task,
            RuntimeArgs::default(),
            &CancelFlag::new(),
            &updates,
        )
        .await
        .unwrap();

        assert_eq!(updates.borrow().state, "Completed");
    }

    /// A non-retryable failure aborts on the first occurrence
    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_aborts() {
        let task = ScriptedTask { failures_left: 5, retryable: false, steps: 0, done: false };
        let updates = updates_channel();

        let res = run_task_to_completion(
            Uuid::new_v4(),
            task,
            RuntimeArgs::default(),
            &CancelFlag::new(),
            &updates,
        )
        .await;

        assert!(matches!(res, Err(TaskDriverError::TaskFailed { .. })));
    }

    /// Exhausting retries fails the task
    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion() {
        let args = RuntimeArgs { n_retries: 3, ..Default::default() };
        let task = ScriptedTask { failures_left: 10, retryable: true, steps: 0, done: false };

        let res = run_task_to_completion(
            Uuid::new_v4(),
            task,
            args,
            &CancelFlag::new(),
            &updates_channel(),
        )
        .await;

        assert!(matches!(res, Err(TaskDriverError::TaskFailed { .. })));
    }

    /// A pre-cancelled driver never steps the task
    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let task = ScriptedTask { failures_left: 0, retryable: true, steps: 0, done: false };

        let res = run_task_to_completion(
            Uuid::new_v4(),
            task,
            RuntimeArgs::default(),
            &cancel,
            &updates_channel(),
        )
        .await;

        assert!(matches!(res, Err(TaskDriverError::Cancelled)));
    }
}
