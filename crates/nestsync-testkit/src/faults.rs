//! Fault injection around a [`NestedSetStore`].

use async_trait::async_trait;
use nestsync_core::effects::{NestedSetStore, StoreBatch};
use nestsync_core::{Cursor, LogEntry, Node, NodeId, StoreError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the wrapper should break next.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Number of upcoming commits to fail
    pub failing_commits: usize,
    /// Number of upcoming node set loads to fail
    pub failing_node_loads: usize,
    /// Sleep before answering a pending log load
    pub pending_load_delay: Option<Duration>,
}

/// Store wrapper that fails or stalls according to a [`FaultPlan`].
pub struct FailingStore<S> {
    inner: Arc<S>,
    plan: Mutex<FaultPlan>,
    commits: AtomicUsize,
    pending_loads: AtomicUsize,
}

impl<S: NestedSetStore> FailingStore<S> {
    /// Wrap `inner` with no faults planned
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            plan: Mutex::new(FaultPlan::default()),
            commits: AtomicUsize::new(0),
            pending_loads: AtomicUsize::new(0),
        }
    }

    /// Replace the fault plan
    pub fn set_plan(&self, plan: FaultPlan) {
        *self.plan.lock() = plan;
    }

    /// Fail the next `count` commits
    pub fn fail_commits(&self, count: usize) {
        self.plan.lock().failing_commits = count;
    }

    /// Delay every pending log load by `delay`
    pub fn delay_pending_loads(&self, delay: Duration) {
        self.plan.lock().pending_load_delay = Some(delay);
    }

    /// Commit attempts seen, failed ones included
    pub fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Pending log loads seen, which is one per merge attempt
    pub fn pending_loads(&self) -> usize {
        self.pending_loads.load(Ordering::SeqCst)
    }

    /// The wrapped store
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn take_fault(counter: &mut usize, what: &str) -> Result<(), StoreError> {
        if *counter == 0 {
            return Ok(());
        }
        *counter -= 1;
        Err(StoreError::backend(format!("injected {what} failure")))
    }
}

#[async_trait]
impl<S: NestedSetStore> NestedSetStore for FailingStore<S> {
    async fn append_log_entries(&self, nodes: Vec<Node>) -> Result<Vec<LogEntry>, StoreError> {
        self.inner.append_log_entries(nodes).await
    }

    async fn load_pending_log_entries(&self, from: Cursor) -> Result<Vec<LogEntry>, StoreError> {
        self.pending_loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.plan.lock().pending_load_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.load_pending_log_entries(from).await
    }

    async fn load_current_nodes(&self) -> Result<Vec<Node>, StoreError> {
        Self::take_fault(&mut self.plan.lock().failing_node_loads, "node load")?;
        self.inner.load_current_nodes().await
    }

    async fn load_node(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        self.inner.load_node(id).await
    }

    async fn load_cursor(&self, stream: &str) -> Result<Cursor, StoreError> {
        self.inner.load_cursor(stream).await
    }

    async fn commit(&self, batch: StoreBatch) -> Result<(), StoreError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Self::take_fault(&mut self.plan.lock().failing_commits, "commit")?;
        self.inner.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::node;
    use assert_matches::assert_matches;
    use nestsync_store::MemoryStore;

    #[tokio::test]
    async fn injected_commit_failures_run_out() {
        let store = FailingStore::new(Arc::new(MemoryStore::new()));
        store.fail_commits(2);

        let batch = || StoreBatch::new().insert_all([node(1, "a", 1, 2)]);
        assert_matches!(store.commit(batch()).await, Err(StoreError::Backend { .. }));
        assert_matches!(store.commit(batch()).await, Err(StoreError::Backend { .. }));
        assert_matches!(store.commit(batch()).await, Ok(()));

        assert_eq!(store.commit_attempts(), 3);
        assert_eq!(store.inner().load_current_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn node_load_failure_is_one_shot() {
        let store = FailingStore::new(Arc::new(MemoryStore::new()));
        store.set_plan(FaultPlan {
            failing_node_loads: 1,
            ..FaultPlan::default()
        });
        assert!(store.load_current_nodes().await.is_err());
        assert!(store.load_current_nodes().await.is_ok());
    }
}
