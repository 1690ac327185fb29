//! Bounded waiting on blocking work.
//!
//! The work runs on its own detached OS thread. Only the caller's wait is
//! bounded: when the deadline passes the thread is abandoned, not cancelled, and
//! keeps running until the work returns by itself. It never holds up process exit.

use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum GuardError<E> {
    #[error("request exceeded {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("worker stopped without returning a result")]
    WorkerLost,

    #[error("failed to start worker thread: {0}")]
    Spawn(String),

    #[error("{0}")]
    Failed(E),
}

/// Run `work` on a worker thread and wait for it at most `limit`.
pub async fn with_timeout<T, E, F>(work: F, limit: Duration) -> Result<T, GuardError<E>>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("veil-worker".to_string())
        .spawn(move || {
            // Receiver is gone after a timeout; the result is simply dropped.
            let _ = tx.send(work());
        })
        .map_err(|e| GuardError::Spawn(e.to_string()))?;

    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(GuardError::Failed(e)),
        Ok(Err(_)) => Err(GuardError::WorkerLost),
        Err(_) => {
            warn!("Worker still running after {:?}; abandoning it", limit);
            Err(GuardError::Timeout(limit))
        }
    }
}
