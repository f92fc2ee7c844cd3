//! Graceful shutdown on SIGTERM and SIGINT.
//!
//! A background task listens for either signal and cancels a shared token
//! that subsystems, e.g. the Axum server, can wait on.

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Signal handler distributing shutdown via a [`CancellationToken`].
pub struct SigDown {
    _task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Register the signal streams. Fails when signal registration does.
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let task_tracker = TaskTracker::new();
        task_tracker.spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => inner.cancel(),
                _ = sigint.recv() => inner.cancel(),
            }
        });
        task_tracker.close();
        Ok(SigDown {
            _task_tracker: task_tracker,
            cancellation_token: outer,
        })
    }

    /// Token to distribute to subsystems that should stop on shutdown.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
