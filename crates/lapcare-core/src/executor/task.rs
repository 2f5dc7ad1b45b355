/// Task functions and their cancellation capability.
///
/// Whether a task receives a [`CancelSignal`] is decided when the task is
/// built, by choosing [`TaskFn::plain`] or [`TaskFn::cancellable`]. Bound
/// arguments are whatever the closure captures.
use super::result::TaskResult;
use super::signal::CancelSignal;
use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

type PlainFn<T> = Box<dyn FnOnce() -> TaskResult<T> + Send>;
type CancellableFn<T> = Box<dyn FnOnce(&CancelSignal) -> TaskResult<T> + Send>;

enum Body<T> {
    Plain(PlainFn<T>),
    Cancellable(CancellableFn<T>),
}

/// A unit of background work, ready to be submitted to the executor.
pub struct TaskFn<T> {
    body: Body<T>,
}

impl<T: Send + 'static> TaskFn<T> {
    /// A task that cannot be interrupted. Cancelling it only detaches the
    /// worker after the grace period.
    pub fn plain<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Display,
    {
        Self {
            body: Body::Plain(Box::new(move || into_task_result(f()))),
        }
    }

    /// A task that polls the signal it is given and returns early (with a
    /// partial `Ok`) once it is set.
    pub fn cancellable<F, E>(f: F) -> Self
    where
        F: FnOnce(&CancelSignal) -> Result<T, E> + Send + 'static,
        E: Display,
    {
        Self {
            body: Body::Cancellable(Box::new(move |signal| into_task_result(f(signal)))),
        }
    }

    pub fn supports_cancellation(&self) -> bool {
        matches!(self.body, Body::Cancellable(_))
    }

    /// Run the body on the current thread, converting errors and panics
    /// into `Failure`.
    pub(crate) fn run(self, signal: Option<&CancelSignal>) -> TaskResult<T> {
        let outcome = match self.body {
            Body::Plain(f) => panic::catch_unwind(AssertUnwindSafe(f)),
            Body::Cancellable(f) => {
                let fallback;
                let signal = match signal {
                    Some(s) => s,
                    None => {
                        fallback = CancelSignal::new();
                        &fallback
                    }
                };
                panic::catch_unwind(AssertUnwindSafe(|| f(signal)))
            }
        };
        outcome.unwrap_or_else(|payload| {
            TaskResult::Failure(format!("task panicked: {}", panic_message(&*payload)))
        })
    }
}

fn into_task_result<T, E: Display>(result: Result<T, E>) -> TaskResult<T> {
    match result {
        Ok(value) => TaskResult::Success(value),
        Err(err) => TaskResult::Failure(err.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_follows_constructor() {
        let plain = TaskFn::plain(|| Ok::<_, String>(1));
        let cancellable = TaskFn::cancellable(|_s: &CancelSignal| Ok::<_, String>(1));
        assert!(!plain.supports_cancellation());
        assert!(cancellable.supports_cancellation());
    }

    #[test]
    fn error_becomes_failure_message() {
        let task = TaskFn::<u32>::plain(|| Err("disk on fire"));
        assert_eq!(task.run(None), TaskResult::Failure("disk on fire".into()));
    }

    #[test]
    fn panic_is_caught_at_boundary() {
        let task = TaskFn::<u32>::plain(|| -> Result<u32, String> { panic!("boom") });
        let result = task.run(None);
        assert_eq!(result.failure(), Some("task panicked: boom"));
    }

    #[test]
    fn cancellable_sees_the_given_signal() {
        let signal = CancelSignal::new();
        signal.cancel();
        let task = TaskFn::cancellable(|s: &CancelSignal| Ok::<_, String>(s.is_cancelled()));
        assert_eq!(task.run(Some(&signal)), TaskResult::Success(true));
    }
}
