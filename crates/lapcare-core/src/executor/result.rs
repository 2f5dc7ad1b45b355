/// Task outcome as cached by the executor.
use std::sync::Arc;

/// Outcome of one completed task: exactly one of success or failure.
///
/// A scanner stopped by its cancellation signal reports `Success` with a
/// partial value; `Failure` is reserved for real errors and panics.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult<T> {
    Success(T),
    Failure(String),
}

impl<T> TaskResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(message) => Some(message),
        }
    }
}

/// A result handed to the coordinator by
/// [`TaskExecutor::process_completions`](super::TaskExecutor::process_completions).
#[derive(Debug, Clone)]
pub struct Delivered<T> {
    pub task_id: String,
    pub result: Arc<TaskResult<T>>,
}
