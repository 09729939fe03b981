use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    /// A delivery attempt is in progress (or was, when the process died).
    Sending,
    /// Retries exhausted. Kept for inspection, never sent again.
    Failed,
}

impl ItemStatus {
    /// Whether the item is still eligible for delivery.
    pub fn is_deliverable(&self) -> bool {
        matches!(self, ItemStatus::Pending | ItemStatus::Sending)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Sending => "sending",
            ItemStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One queued payload plus its delivery bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundItem<T> {
    pub id: Uuid,
    pub payload: T,
    pub created_at: DateTime<Utc>,
    pub status: ItemStatus,
    pub retry_count: u32,
}

impl<T> OutboundItem<T> {
    pub fn new(payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            created_at: Utc::now(),
            status: ItemStatus::Pending,
            retry_count: 0,
        }
    }
}
