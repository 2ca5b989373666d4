//! Background execution contract for the merge worker.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Signal a background merge worker watches to stop early.
#[async_trait]
pub trait CancellationToken: Send + Sync {
    /// Completes once the worker should stop
    async fn cancelled(&self);

    /// Whether the stop signal has already fired
    fn is_cancelled(&self) -> bool;
}

/// Execution resource handed to background components.
///
/// Components never pick a runtime on their own; whoever constructs them
/// decides where their long-running futures execute.
pub trait TaskSpawner: Send + Sync {
    /// Run `fut` in the background until it completes or `token` fires.
    fn spawn_cancellable(&self, fut: BoxFuture<'static, ()>, token: Arc<dyn CancellationToken>);
}
