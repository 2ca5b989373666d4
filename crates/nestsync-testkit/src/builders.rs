//! Node and log entry builders.

use chrono::{DateTime, Utc};
use nestsync_core::{LogEntry, Node};

/// Fixed timestamp used by every builder unless overridden.
pub const TEST_EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Active node stamped with [`TEST_EPOCH`].
pub fn node(id: u64, label: &str, left: u32, right: u32) -> Node {
    Node::new(id, label, left, right, TEST_EPOCH)
}

/// Log entries with consecutive ids starting at `first`.
pub fn log_entries(first: u64, nodes: impl IntoIterator<Item = Node>) -> Vec<LogEntry> {
    nodes
        .into_iter()
        .zip(first..)
        .map(|(node, log_id)| LogEntry::new(log_id, node))
        .collect()
}

/// Builds a log stream with explicit or consecutive log ids.
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    entries: Vec<LogEntry>,
    next: u64,
}

impl LogBuilder {
    /// Empty stream whose first entry gets log id 1
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 1,
        }
    }

    /// Append a snapshot at the next log id
    pub fn push(mut self, node: Node) -> Self {
        self.entries.push(LogEntry::new(self.next, node));
        self.next += 1;
        self
    }

    /// Append a snapshot at an explicit log id; later pushes continue after it
    pub fn push_at(mut self, log_id: u64, node: Node) -> Self {
        self.entries.push(LogEntry::new(log_id, node));
        self.next = self.next.max(log_id + 1);
        self
    }

    /// Entries in insertion order
    pub fn build(self) -> Vec<LogEntry> {
        self.entries
    }

    /// Entries in reverse insertion order
    pub fn build_reversed(self) -> Vec<LogEntry> {
        let mut entries = self.entries;
        entries.reverse();
        entries
    }
}
