//! Tracks the background tasks owned by a scheduler.
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A registry of named background tasks with a bounded shutdown.
///
/// Tasks are expected to watch a shared stop signal on their own; the manager
/// only waits for them to finish and aborts whichever outlive the grace
/// window.
#[derive(Debug, Default)]
pub struct TaskManager {
    handles: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `future` on the given runtime and keeps its handle.
    pub fn spawn<F>(&self, runtime: &tokio::runtime::Handle, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = runtime.spawn(future);
        self.lock().push((name, handle));
    }

    /// Number of tasks not yet reaped by [`shutdown`](Self::shutdown).
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits up to `grace` for each task to finish, aborting any that do not.
    ///
    /// Returns the names of the tasks that had to be aborted. Calling this
    /// again after it returned is a no-op.
    pub async fn shutdown(&self, grace: Duration) -> Vec<&'static str> {
        let handles: Vec<_> = self.lock().drain(..).collect();
        let mut aborted = Vec::new();

        for (name, mut handle) in handles {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => debug!(task_name = name, "Task shut down gracefully."),
                Ok(Err(e)) if e.is_panic() => warn!(task_name = name, "Task panicked."),
                Ok(Err(_)) => debug!(task_name = name, "Task was cancelled."),
                Err(_) => {
                    warn!(task_name = name, ?grace, "Task did not stop in time, aborting.");
                    handle.abort();
                    aborted.push(name);
                }
            }
        }

        aborted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(&'static str, JoinHandle<()>)>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
