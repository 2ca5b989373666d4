//! Decoding of change records published by the capture connector.
//!
//! The connector publishes one record per changed row of the source node
//! table. Timestamps are epoch milliseconds, boundaries are named after the
//! source columns (`lft`, `rgt`).

use crate::errors::CaptureError;
use crate::types::{Node, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire shape of a captured node row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Source row id
    pub id: u64,
    /// Node payload
    pub label: String,
    /// Left boundary column
    pub lft: i64,
    /// Right boundary column
    pub rgt: i64,
    /// Active flag column
    pub active: bool,
    /// Creation time, epoch milliseconds
    pub created: i64,
    /// Modification time, epoch milliseconds
    pub updated: i64,
}

impl CaptureRecord {
    /// Convert into a node, checking coordinate and timestamp ranges.
    pub fn into_node(self) -> Result<Node, CaptureError> {
        Ok(Node {
            id: NodeId(self.id),
            left: coordinate("lft", self.lft)?,
            right: coordinate("rgt", self.rgt)?,
            active: self.active,
            created: timestamp("created", self.created)?,
            updated: timestamp("updated", self.updated)?,
            label: self.label,
        })
    }
}

impl From<&Node> for CaptureRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.0,
            label: node.label.clone(),
            lft: i64::from(node.left),
            rgt: i64::from(node.right),
            active: node.active,
            created: node.created.timestamp_millis(),
            updated: node.updated.timestamp_millis(),
        }
    }
}

/// Decode one JSON encoded record.
pub fn decode_record(payload: &[u8]) -> Result<Node, CaptureError> {
    serde_json::from_slice::<CaptureRecord>(payload)?.into_node()
}

/// Decode a polled batch of records, failing on the first malformed one.
pub fn decode_batch<'a, I>(payloads: I) -> Result<Vec<Node>, CaptureError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    payloads.into_iter().map(decode_record).collect()
}

fn coordinate(field: &'static str, value: i64) -> Result<u32, CaptureError> {
    u32::try_from(value)
        .ok()
        .filter(|coordinate| *coordinate > 0)
        .ok_or(CaptureError::Coordinate { field, value })
}

fn timestamp(field: &'static str, millis: i64) -> Result<DateTime<Utc>, CaptureError> {
    DateTime::from_timestamp_millis(millis).ok_or(CaptureError::Timestamp { field, millis })
}
