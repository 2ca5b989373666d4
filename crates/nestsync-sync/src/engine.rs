//! Merge of the persisted node log into the persisted node set.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use nestsync_core::effects::{NestedSetStore, StoreBatch, TreeUpdateListener};
use nestsync_core::{Cursor, LogEntry, TreeError};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::merge::{merge, MergeOutcome};

/// Reads pending log entries, validates the prospective tree and commits it.
///
/// Not reentrant by itself: callers run at most one `sync_pending` at a time,
/// which [`NotificationSquasher`](crate::NotificationSquasher) guarantees.
pub struct LogMergeEngine {
    store: Arc<dyn NestedSetStore>,
    stream: String,
    retry_log_threshold: u32,
    listeners: Vec<Arc<dyn TreeUpdateListener>>,
    consecutive_rejections: AtomicU32,
}

impl LogMergeEngine {
    /// Create an engine merging the log stream named in `config`
    pub fn new(store: Arc<dyn NestedSetStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            stream: config.log_stream.clone(),
            retry_log_threshold: config.merge_retry_log_threshold.max(1),
            listeners: Vec::new(),
            consecutive_rejections: AtomicU32::new(0),
        }
    }

    /// Signal `listener` after every committed merge
    pub fn with_tree_listener(mut self, listener: Arc<dyn TreeUpdateListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Name of the log stream this engine advances
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Rejected merges since the last successful or empty one
    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections.load(Ordering::SeqCst)
    }

    /// Persisted cursor of this engine's stream
    pub async fn cursor(&self) -> Result<Cursor, SyncError> {
        Ok(self.store.load_cursor(&self.stream).await?)
    }

    /// Merge every log entry beyond the persisted cursor.
    ///
    /// A rejected merge writes nothing and leaves the cursor in place, so the
    /// same entries are tried again on the next call. Listeners are signalled
    /// exactly once per committed merge.
    pub async fn sync_pending(&self) -> Result<MergeOutcome, SyncError> {
        let cursor = self.store.load_cursor(&self.stream).await?;
        let pending: Vec<LogEntry> = self
            .store
            .load_pending_log_entries(cursor)
            .await?
            .into_iter()
            .filter(|entry| !cursor.covers(entry.log_id))
            .collect();

        if pending.is_empty() {
            debug!(stream = %self.stream, %cursor, "No pending log entries");
            self.consecutive_rejections.store(0, Ordering::SeqCst);
            return Ok(MergeOutcome::NoOp);
        }

        let current = self.store.load_current_nodes().await?;
        let outcome = merge(&pending, &current);

        match &outcome {
            MergeOutcome::NoOp => {}
            MergeOutcome::Rejected(reason) => self.record_rejection(cursor, pending.len(), reason),
            MergeOutcome::Applied(result) => {
                let batch = StoreBatch::new()
                    .insert_all(result.inserted.iter().cloned())
                    .update_all(result.updated.iter().cloned())
                    .advance_cursor(self.stream.clone(), result.new_cursor);
                self.store.commit(batch).await?;
                self.consecutive_rejections.store(0, Ordering::SeqCst);

                info!(
                    stream = %self.stream,
                    cursor = %result.new_cursor,
                    inserted = result.inserted.len(),
                    updated = result.updated.len(),
                    "Merged pending log entries"
                );
                for listener in &self.listeners {
                    listener.on_tree_updated();
                }
            }
        }

        Ok(outcome)
    }

    fn record_rejection(&self, cursor: Cursor, pending: usize, reason: &TreeError) {
        let rejections = self.consecutive_rejections.fetch_add(1, Ordering::SeqCst) + 1;
        warn!(
            stream = %self.stream,
            %cursor,
            pending,
            rejections,
            %reason,
            "Pending log entries do not form a valid tree, retrying on next update"
        );
        if rejections % self.retry_log_threshold == 0 {
            warn!(
                stream = %self.stream,
                %cursor,
                pending,
                rejections,
                "Log stream has not advanced for {rejections} merges, a snapshot may be missing"
            );
        }
    }
}

impl std::fmt::Debug for LogMergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogMergeEngine")
            .field("stream", &self.stream)
            .field("listeners", &self.listeners.len())
            .field("consecutive_rejections", &self.consecutive_rejections())
            .finish()
    }
}
