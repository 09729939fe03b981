//! Delivery side of the outbound queue.

use async_trait::async_trait;

/// Something that can deliver one queued payload.
///
/// Returning `Err` leaves the item queued for a later flush.
#[async_trait]
pub trait OutboundSender<T>: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn send(&self, payload: &T) -> Result<(), Self::Error>;
}
