//! Coalescing of "log updated" notifications into merge runs.
//!
//! ```text
//! notify() ──try_send──> [ slot (capacity 1) ] ──recv──> worker ──> MergeTask::run_merge
//!    │ slot full
//!    └─> squashed
//! ```
//!
//! The worker empties the slot right before it starts a merge, so a
//! notification arriving while a merge runs refills the slot and causes
//! exactly one follow-up run. Only the worker runs merges, so two merges never
//! overlap.
//!
//! Accepted requests are counted as outstanding from just before they enter
//! the slot until their merge has finished, so a request the worker has taken
//! but not started yet still reads as pending.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nestsync_core::effects::{LogUpdateListener, TaskSpawner};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::engine::LogMergeEngine;
use crate::errors::SyncError;
use crate::runtime::CancelSource;

/// Work the squasher runs on every accepted notification.
#[async_trait]
pub trait MergeTask: Send + Sync + 'static {
    /// Run one merge to completion
    async fn run_merge(&self) -> Result<(), SyncError>;
}

#[async_trait]
impl MergeTask for LogMergeEngine {
    async fn run_merge(&self) -> Result<(), SyncError> {
        self.sync_pending().await.map(|_| ())
    }
}

/// Observable state of a [`NotificationSquasher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquasherState {
    /// No merge requested or running
    Idle,
    /// A merge is requested and has not started
    Pending,
    /// A merge is executing
    Running,
    /// Shut down; notifications are ignored
    Stopped,
}

/// Notification counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquasherStats {
    /// Notifications that scheduled a merge
    pub accepted: u64,
    /// Notifications absorbed by an already pending merge
    pub squashed: u64,
    /// Merges that ran to completion, failed ones included
    pub completed: u64,
    /// Merges that returned an error
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    running: AtomicBool,
    outstanding: AtomicU64,
    stopped: AtomicBool,
    accepted: AtomicU64,
    squashed: AtomicU64,
    failed: AtomicU64,
}

/// Turns bursts of notifications into at most one running and one pending merge.
pub struct NotificationSquasher {
    slot: mpsc::Sender<()>,
    counters: Arc<Counters>,
    completed: watch::Receiver<u64>,
    stop_tx: watch::Sender<bool>,
    worker_done: Mutex<Option<oneshot::Receiver<()>>>,
    cancel: CancelSource,
    grace: Duration,
}

impl NotificationSquasher {
    /// Spawn the merge worker on `spawner` and return its notification handle.
    ///
    /// `grace` bounds how long [`shutdown`](Self::shutdown) waits for an
    /// in-flight merge.
    pub fn start(task: Arc<dyn MergeTask>, spawner: &dyn TaskSpawner, grace: Duration) -> Self {
        let (slot, requests) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (completed_tx, completed) = watch::channel(0u64);
        let (done_tx, done_rx) = oneshot::channel();
        let counters = Arc::new(Counters::default());
        let cancel = CancelSource::new();

        let worker = Worker {
            task,
            requests,
            stop_rx,
            completed_tx,
            counters: Arc::clone(&counters),
        };
        spawner.spawn_cancellable(
            Box::pin(async move {
                worker.run().await;
                let _ = done_tx.send(());
            }),
            cancel.token(),
        );

        Self {
            slot,
            counters,
            completed,
            stop_tx,
            worker_done: Mutex::new(Some(done_rx)),
            cancel,
            grace,
        }
    }

    /// Request a merge. Never blocks.
    pub fn notify(&self) {
        if self.counters.stopped.load(Ordering::SeqCst) {
            debug!("Ignoring log update notification after shutdown");
            return;
        }

        // counted before the send so the worker can never finish it first
        self.counters.outstanding.fetch_add(1, Ordering::SeqCst);
        match self.slot.try_send(()) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::SeqCst);
                debug!("Merge scheduled");
            }
            Err(mpsc::error::TrySendError::Full(())) => {
                self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
                self.counters.squashed.fetch_add(1, Ordering::SeqCst);
                debug!("Merge already pending, squashing notification");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
                warn!("Merge worker is gone, dropping notification");
            }
        }
    }

    /// Current state
    pub fn state(&self) -> SquasherState {
        if self.counters.stopped.load(Ordering::SeqCst) {
            SquasherState::Stopped
        } else if self.counters.running.load(Ordering::SeqCst) {
            SquasherState::Running
        } else if self.counters.outstanding.load(Ordering::SeqCst) > 0 {
            SquasherState::Pending
        } else {
            SquasherState::Idle
        }
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SquasherStats {
        SquasherStats {
            accepted: self.counters.accepted.load(Ordering::SeqCst),
            squashed: self.counters.squashed.load(Ordering::SeqCst),
            completed: *self.completed.borrow(),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Wait until at least `count` merges have completed since start.
    ///
    /// Returns [`SyncError::ShutDown`] if the worker exits first.
    pub async fn wait_for_completed(&self, count: u64) -> Result<(), SyncError> {
        let mut completed = self.completed.clone();
        completed
            .wait_for(|done| *done >= count)
            .await
            .map(|_| ())
            .map_err(|_| SyncError::ShutDown)
    }

    /// Stop accepting notifications and wind the worker down.
    ///
    /// An in-flight merge gets the grace period to finish; after that the
    /// worker is cancelled. A pending, not yet started merge is dropped.
    pub async fn shutdown(&self) {
        if self.counters.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.send(true);

        let worker_done = self.worker_done.lock().take();
        if let Some(mut worker_done) = worker_done {
            if tokio::time::timeout(self.grace, &mut worker_done).await.is_err() {
                warn!(
                    grace_ms = self.grace.as_millis() as u64,
                    "Merge still running after grace period, cancelling"
                );
                self.cancel.cancel();
            }
        }
        info!(stats = ?self.stats(), "Notification squasher stopped");
    }
}

impl LogUpdateListener for NotificationSquasher {
    fn on_log_batch_written(&self) {
        self.notify();
    }
}

impl std::fmt::Debug for NotificationSquasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSquasher")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .field("grace", &self.grace)
            .finish()
    }
}

struct Worker {
    task: Arc<dyn MergeTask>,
    requests: mpsc::Receiver<()>,
    stop_rx: watch::Receiver<bool>,
    completed_tx: watch::Sender<u64>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.stop_rx.changed() => break,
                request = self.requests.recv() => {
                    if request.is_none() {
                        break;
                    }
                    self.merge_once().await;
                }
            }
        }
        debug!("Merge worker exiting");
    }

    async fn merge_once(&self) {
        self.counters.running.store(true, Ordering::SeqCst);
        if let Err(error) = self.task.run_merge().await {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            error!(%error, "Merge of pending log entries failed");
        }
        self.completed_tx.send_modify(|completed| *completed += 1);
        self.counters.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.counters.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TokioTaskSpawner;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct SlowTask {
        runs: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl MergeTask for SlowTask {
        async fn run_merge(&self) -> Result<(), SyncError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(SyncError::ShutDown);
            }
            Ok(())
        }
    }

    fn start(task: Arc<SlowTask>, spawner: &TokioTaskSpawner) -> NotificationSquasher {
        NotificationSquasher::start(task, spawner, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn single_notification_runs_one_merge() {
        let spawner = TokioTaskSpawner::new();
        let task = Arc::new(SlowTask::default());
        let squasher = start(task.clone(), &spawner);
        assert_eq!(squasher.state(), SquasherState::Idle);

        squasher.notify();
        squasher.wait_for_completed(1).await.unwrap();

        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
        assert_eq!(squasher.stats().accepted, 1);
        assert_eq!(squasher.state(), SquasherState::Idle);
    }

    #[tokio::test]
    async fn burst_before_worker_starts_collapses_to_one() {
        let spawner = TokioTaskSpawner::new();
        let task = Arc::new(SlowTask::default());
        let squasher = start(task.clone(), &spawner);

        // current-thread runtime: the worker cannot run until we yield
        for _ in 0..10 {
            squasher.notify();
        }
        assert_eq!(squasher.state(), SquasherState::Pending);
        squasher.wait_for_completed(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(task.runs.load(Ordering::SeqCst), 1);
        let stats = squasher.stats();
        assert_eq!((stats.accepted, stats.squashed), (1, 9));
    }

    #[tokio::test]
    async fn failed_merge_keeps_worker_serving() {
        let spawner = TokioTaskSpawner::new();
        let task = Arc::new(SlowTask {
            fail: true,
            ..SlowTask::default()
        });
        let squasher = start(task.clone(), &spawner);

        squasher.notify();
        squasher.wait_for_completed(1).await.unwrap();
        squasher.notify();
        squasher.wait_for_completed(2).await.unwrap();

        assert_eq!(task.runs.load(Ordering::SeqCst), 2);
        assert_eq!(squasher.stats().failed, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn accepted_request_never_reads_idle_before_its_merge_completes() {
        let spawner = TokioTaskSpawner::new();
        let task = Arc::new(SlowTask {
            delay: Duration::from_millis(5),
            ..SlowTask::default()
        });
        let squasher = start(task.clone(), &spawner);

        for round in 1..=20u64 {
            squasher.notify();
            loop {
                // state first: Idle implies the completion was already published
                let state = squasher.state();
                let completed = squasher.stats().completed;
                if completed >= round {
                    break;
                }
                assert_ne!(state, SquasherState::Idle, "round {round}");
                tokio::task::yield_now().await;
            }
        }
        squasher.wait_for_completed(20).await.unwrap();
        assert_eq!(task.runs.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn notify_after_shutdown_is_ignored() {
        let spawner = TokioTaskSpawner::new();
        let task = Arc::new(SlowTask::default());
        let squasher = start(task.clone(), &spawner);

        squasher.shutdown().await;
        assert_eq!(squasher.state(), SquasherState::Stopped);
        squasher.notify();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(task.runs.load(Ordering::SeqCst), 0);
        assert_eq!(squasher.stats(), SquasherStats::default());
        // second shutdown is a no-op
        squasher.shutdown().await;
    }
}
