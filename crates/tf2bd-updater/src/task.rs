//! Fire-and-forget background work observed by polling.
//!
//! Each stage runs its blocking I/O on a dedicated thread. The owning thread
//! never waits: it asks [`Task::is_ready`] once per tick and only calls
//! [`Task::join`] after that returned `true`.

use std::any::Any;
use std::thread::{self, JoinHandle};

use crate::errors::{Result, UpdateError};

pub struct Task<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Running(JoinHandle<Result<T>>),
    Done(Result<T>),
}

impl<T: Send + 'static> Task<T> {
    /// Run `f` on a new named thread. A thread that cannot be spawned yields
    /// an already-failed task.
    pub fn spawn<F>(name: &str, f: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let inner = match thread::Builder::new().name(name.to_string()).spawn(f) {
            Ok(handle) => Inner::Running(handle),
            Err(e) => Inner::Done(Err(UpdateError::Io(e))),
        };
        Self { inner }
    }
}

impl<T> Task<T> {
    /// A task that has already finished with `result`.
    pub fn ready(result: Result<T>) -> Self {
        Self {
            inner: Inner::Done(result),
        }
    }

    /// Non-blocking completion check.
    pub fn is_ready(&self) -> bool {
        match &self.inner {
            Inner::Running(handle) => handle.is_finished(),
            Inner::Done(_) => true,
        }
    }

    /// Take the result. Blocks if the task is still running, so callers check
    /// [`Task::is_ready`] first.
    pub fn join(self) -> Result<T> {
        match self.inner {
            Inner::Done(result) => result,
            Inner::Running(handle) => handle
                .join()
                .unwrap_or_else(|payload| Err(UpdateError::Task(panic_message(payload)))),
        }
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("ready", &self.is_ready())
            .finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
