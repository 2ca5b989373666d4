//! Tokio implementations of the task spawning contract.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for JoinHandle storage because:
//! 1. Operations are a push with a prune of finished handles, or a drain on shutdown
//! 2. Lock is never held across `.await` points
//! 3. No I/O or async work inside lock scope

use std::sync::Arc;

use futures::future::BoxFuture;
use nestsync_core::effects::{CancellationToken, TaskSpawner};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawns onto the ambient Tokio runtime and tracks the tasks it started.
///
/// [`shutdown`](Self::shutdown) (or dropping the spawner) stops every task it
/// spawned, whether or not the task's own token fired.
#[derive(Debug)]
pub struct TokioTaskSpawner {
    shutdown: CancelSource,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioTaskSpawner {
    /// Create a spawner with no tasks
    pub fn new() -> Self {
        Self {
            shutdown: CancelSource::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Cancel and abort every tracked task.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Default for TokioTaskSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TokioTaskSpawner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl TaskSpawner for TokioTaskSpawner {
    fn spawn_cancellable(&self, fut: BoxFuture<'static, ()>, token: Arc<dyn CancellationToken>) {
        let shutdown = self.shutdown.token();
        self.track(tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = token.cancelled() => {}
                _ = fut => {}
            }
        }));
    }
}

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    /// Signal that has not fired
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Fire the signal; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal fired
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// A token observing this signal
    pub fn token(&self) -> Arc<dyn CancellationToken> {
        Arc::new(WatchCancellationToken {
            rx: self.tx.subscribe(),
        })
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct WatchCancellationToken {
    rx: watch::Receiver<bool>,
}

#[async_trait::async_trait]
impl CancellationToken for WatchCancellationToken {
    async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // a dropped source can no longer cancel
                futures::future::pending::<()>().await;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}
