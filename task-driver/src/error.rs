//! Error types emitted by the task driver

use std::fmt::{Display, Formatter, Result as FmtResult};

/// The error type emitted when a task fails to run to completion
#[derive(Clone, Debug)]
pub enum TaskDriverError {
    /// The task failed terminally; carries the stable user-facing message
    TaskFailed {
        /// The display name of the failed task
        task: String,
        /// The user-facing failure message
        message: String,
    },
    /// The task was cancelled before completion
    Cancelled,
}

impl Display for TaskDriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskDriverError::TaskFailed { task, message } => {
                write!(f, "task {task} failed: {message}")
            },
            TaskDriverError::Cancelled => write!(f, "task cancelled"),
        }
    }
}

impl std::error::Error for TaskDriverError {}
