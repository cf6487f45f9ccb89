//! Drives the client's long-running operations as retried state machines
//!
//! Each operation (shield, unshield, swap) is a task: a state enum, a typed
//! error with explicit retryability, and a `step()` that advances one state
//! at a time. The driver steps tasks to completion with bounded backoff,
//! cooperative cancellation, and status updates for listeners.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod driver;
pub mod error;
pub(crate) mod helpers;
pub mod task_state;
pub mod tasks;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_helpers;

use common::types::tasks::TaskDescriptor;

pub use driver::{run_task_to_completion, RuntimeArgs};
pub use error::TaskDriverError;
pub use task_state::{StateWrapper, TaskStatusUpdate};
pub use traits::{Task, TaskContext, TaskError, TaskState};

use tasks::shield::ShieldTask;
use tasks::swap::SwapTask;
use tasks::unshield::UnshieldTask;

/// Construct the task for a descriptor and run it to completion
///
/// Construction failures (unknown commitment, locked position) surface the
/// same way as runtime failures, without any network traffic
pub async fn run_task(
    descriptor: TaskDescriptor,
    ctx: TaskContext,
    args: RuntimeArgs,
) -> Result<(), TaskDriverError> {
    match descriptor {
        TaskDescriptor::Shield(desc) => start::<ShieldTask>("shield", desc, ctx, args).await,
        TaskDescriptor::Unshield(desc) => {
            start::<UnshieldTask>("unshield", desc, ctx, args).await
        },
        TaskDescriptor::Swap(desc) => start::<SwapTask>("swap", desc, ctx, args).await,
    }
}

/// Construct and run a single task
async fn start<T: Task>(
    name: &str,
    descriptor: T::Descriptor,
    ctx: TaskContext,
    args: RuntimeArgs,
) -> Result<(), TaskDriverError> {
    let task_id = ctx.task_id;
    let cancel = ctx.cancel.clone();
    let updates = ctx.updates.clone();

    let task = T::new(descriptor, ctx).await.map_err(|e| TaskDriverError::TaskFailed {
        task: name.to_string(),
        message: e.user_message(),
    })?;

    run_task_to_completion(task_id, task, args, &cancel, &updates).await
}
