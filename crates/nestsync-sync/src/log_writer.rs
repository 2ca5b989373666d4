//! Appends captured node snapshots to the log.

use std::sync::Arc;

use nestsync_core::capture::decode_batch;
use nestsync_core::effects::{LogUpdateListener, NestedSetStore};
use nestsync_core::{LogEntry, Node};
use tracing::debug;

use crate::errors::SyncError;

/// Batch writer for the node log.
///
/// Every appended batch produces exactly one `on_log_batch_written` call per
/// registered listener, after the entries are persisted.
pub struct LogWriter {
    store: Arc<dyn NestedSetStore>,
    listeners: Vec<Arc<dyn LogUpdateListener>>,
}

impl LogWriter {
    /// Create a writer with no listeners
    pub fn new(store: Arc<dyn NestedSetStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
        }
    }

    /// Signal `listener` after every appended batch
    pub fn with_listener(mut self, listener: Arc<dyn LogUpdateListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Append one batch of snapshots. An empty batch writes and signals nothing.
    pub async fn write_batch(&self, nodes: Vec<Node>) -> Result<Vec<LogEntry>, SyncError> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.store.append_log_entries(nodes).await?;
        debug!(
            entries = entries.len(),
            first = ?entries.first().map(|entry| entry.log_id),
            last = ?entries.last().map(|entry| entry.log_id),
            "Appended log batch"
        );

        for listener in &self.listeners {
            listener.on_log_batch_written();
        }
        Ok(entries)
    }

    /// Decode a polled batch of JSON capture records and append it.
    ///
    /// A malformed record fails the whole batch before anything is written.
    pub async fn write_records<'a, I>(&self, payloads: I) -> Result<Vec<LogEntry>, SyncError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let nodes = decode_batch(payloads)?;
        self.write_batch(nodes).await
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use nestsync_core::capture::CaptureRecord;
    use nestsync_core::LogId;
    use nestsync_store::MemoryStore;
    use nestsync_testkit::node;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl LogUpdateListener for Counter {
        fn on_log_batch_written(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn one_signal_per_batch() {
        let counter = Arc::new(Counter::default());
        let writer = LogWriter::new(Arc::new(MemoryStore::new())).with_listener(counter.clone());

        let entries = writer
            .write_batch(vec![node(1, "A", 1, 4), node(2, "B", 2, 3)])
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].log_id, LogId(2));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        writer.write_batch(Vec::new()).await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_record_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let counter = Arc::new(Counter::default());
        let writer = LogWriter::new(store.clone()).with_listener(counter.clone());

        let good = encoded_record(&node(1, "A", 1, 2));
        let result = writer
            .write_records([good.as_slice(), b"{\"id\":2}".as_slice()])
            .await;
        assert_matches!(result, Err(SyncError::Capture(_)));
        assert_eq!(store.log_len(), 0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        let entries = writer.write_records([good.as_slice()]).await.unwrap();
        assert_eq!(entries[0].node, node(1, "A", 1, 2));
    }

    fn encoded_record(node: &Node) -> Vec<u8> {
        let record = CaptureRecord::from(node);
        format!(
            r#"{{"id":{},"label":"{}","lft":{},"rgt":{},"active":{},"created":{},"updated":{}}}"#,
            record.id, record.label, record.lft, record.rgt, record.active, record.created, record.updated
        )
        .into_bytes()
    }
}
