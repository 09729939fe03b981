//! File-backed FIFO of payloads awaiting delivery.
//!
//! Every mutation is written through to a JSON file so queued items survive
//! restarts. Items are delivered oldest first; a failed delivery bumps the
//! item's retry count and, once `max_retries` is reached, parks it as
//! [`ItemStatus::Failed`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::item::{ItemStatus, OutboundItem};
use crate::sender::OutboundSender;

/// Result of one [`DurableQueue::flush`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    /// Set when the pass stopped on a failed delivery.
    pub stopped_on: Option<Uuid>,
    /// Another flush was already running, so this one did nothing.
    pub skipped: bool,
}

pub struct DurableQueue<T> {
    /// `None` keeps the queue in memory only.
    path: Option<PathBuf>,
    max_retries: u32,
    items: Mutex<Vec<OutboundItem<T>>>,
    flushing: AtomicBool,
}

/// Clears the reentrancy flag however the flush ends.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<T> DurableQueue<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open (or create) a queue persisted at `path`.
    ///
    /// A corrupt file is logged and replaced by an empty queue rather than
    /// failing startup.
    pub fn open(path: impl Into<PathBuf>, max_retries: u32) -> Result<Self, QueueError> {
        let path = path.into();
        let items = load_items(&path)?;
        if !items.is_empty() {
            info!(path = %path.display(), count = items.len(), "outbound queue restored");
        }
        Ok(Self {
            path: Some(path),
            max_retries,
            items: Mutex::new(items),
            flushing: AtomicBool::new(false),
        })
    }

    pub fn in_memory(max_retries: u32) -> Self {
        Self {
            path: None,
            max_retries,
            items: Mutex::new(Vec::new()),
            flushing: AtomicBool::new(false),
        }
    }

    pub fn enqueue(&self, payload: T) -> Result<Uuid, QueueError> {
        let item = OutboundItem::new(payload);
        let id = item.id;
        let mut items = self.lock();
        items.push(item);
        if let Err(e) = self.persist(&items) {
            items.pop();
            return Err(e);
        }
        debug!(item_id = %id, depth = items.len(), "queued outbound item");
        Ok(id)
    }

    /// Oldest deliverable item. Items stuck in `sending` (e.g. after a crash
    /// mid-delivery) are eligible again.
    pub fn next_pending(&self) -> Option<OutboundItem<T>> {
        self.lock()
            .iter()
            .filter(|item| item.status.is_deliverable())
            .min_by_key(|item| item.created_at)
            .cloned()
    }

    pub fn mark_sending(&self, id: Uuid) -> Result<(), QueueError> {
        let mut items = self.lock();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(QueueError::NotFound(id))?;
        item.status = ItemStatus::Sending;
        self.persist(&items)
    }

    /// Delivery succeeded: drop the item.
    pub fn ack(&self, id: Uuid) -> Result<(), QueueError> {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(QueueError::NotFound(id));
        }
        self.persist(&items)
    }

    /// Delivery failed: count the retry and return the item's new status.
    pub fn nack(&self, id: Uuid) -> Result<ItemStatus, QueueError> {
        let mut items = self.lock();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(QueueError::NotFound(id))?;
        item.retry_count += 1;
        item.status = if item.retry_count >= self.max_retries {
            warn!(item_id = %id, retries = item.retry_count, "outbound item exhausted retries");
            ItemStatus::Failed
        } else {
            ItemStatus::Pending
        };
        let status = item.status;
        self.persist(&items)?;
        Ok(status)
    }

    pub fn failed_items(&self) -> Vec<OutboundItem<T>> {
        self.lock()
            .iter()
            .filter(|item| item.status == ItemStatus::Failed)
            .cloned()
            .collect()
    }

    /// Number of items still awaiting delivery.
    pub fn pending_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|item| item.status.is_deliverable())
            .count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Deliver queued items oldest first, stopping at the first failure.
    ///
    /// Only one flush runs at a time; a concurrent call returns immediately
    /// with `skipped` set.
    pub async fn flush<S>(&self, sender: &S) -> Result<FlushReport, QueueError>
    where
        S: OutboundSender<T> + ?Sized,
    {
        if self.flushing.swap(true, Ordering::AcqRel) {
            debug!("outbound flush already running");
            return Ok(FlushReport {
                skipped: true,
                ..FlushReport::default()
            });
        }
        let _guard = FlushGuard(&self.flushing);

        let mut report = FlushReport::default();
        while let Some(item) = self.next_pending() {
            self.mark_sending(item.id)?;
            match sender.send(&item.payload).await {
                Ok(()) => {
                    self.ack(item.id)?;
                    report.sent += 1;
                }
                Err(e) => {
                    let status = self.nack(item.id)?;
                    warn!(item_id = %item.id, status = %status, error = %e, "outbound delivery failed");
                    report.stopped_on = Some(item.id);
                    break;
                }
            }
        }

        if report.sent > 0 {
            info!(sent = report.sent, remaining = self.pending_count(), "outbound queue flushed");
        }
        Ok(report)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<OutboundItem<T>>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, items: &[OutboundItem<T>]) -> Result<(), QueueError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(items)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn load_items<T: DeserializeOwned>(path: &Path) -> Result<Vec<OutboundItem<T>>, QueueError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    match serde_json::from_str(&data) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "discarding corrupt outbound queue file");
            Ok(Vec::new())
        }
    }
}
